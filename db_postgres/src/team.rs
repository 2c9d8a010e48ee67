//! store transaction methods for teams, memberships, and warnings

use crate::{PgTx, map_db_err, schema::team_members, schema::team_warnings, schema::tenant_users};
use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::{BoolExpressionMethods, ExpressionMethods, Insertable, QueryDsl};
use diesel_async::RunQueryDsl;
use engine_core::{DbResult, TeamWarning, TxTeams};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Insertable)]
#[diesel(table_name = team_warnings)]
struct WriteDbTeamWarning {
    id: Uuid,
    tenant_id: Uuid,
    team_id: Uuid,
    incident_id: Uuid,
    reason: String,
    issued_by: Uuid,
    issued_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
impl TxTeams for PgTx {
    #[instrument(name = "db.team.is_member", skip(self), fields(team_id = %team))]
    async fn is_team_member(
        &mut self,
        tenant: Uuid,
        team: Uuid,
        profile: Uuid,
    ) -> DbResult<bool> {
        diesel::select(exists(
            team_members::table
                .filter(team_members::tenant_id.eq(tenant))
                .filter(team_members::team_id.eq(team))
                .filter(team_members::profile_id.eq(profile)),
        ))
        .get_result::<bool>(&mut self.conn)
        .await
        .map_err(map_db_err)
    }

    #[instrument(name = "db.team.members", skip(self), fields(team_id = %team))]
    async fn list_team_members(&mut self, tenant: Uuid, team: Uuid) -> DbResult<Vec<Uuid>> {
        team_members::table
            .filter(team_members::tenant_id.eq(tenant))
            .filter(team_members::team_id.eq(team))
            .order(team_members::created_at.asc())
            .select(team_members::profile_id)
            .load::<Uuid>(&mut self.conn)
            .await
            .map_err(map_db_err)
    }

    #[instrument(name = "db.tenant.admins", skip(self))]
    async fn list_tenant_admins(&mut self, tenant: Uuid) -> DbResult<Vec<Uuid>> {
        tenant_users::table
            .filter(tenant_users::tenant_id.eq(tenant))
            .filter(
                tenant_users::role
                    .eq("admin")
                    .or(tenant_users::role.eq("owner")),
            )
            .select(tenant_users::profile_id)
            .load::<Uuid>(&mut self.conn)
            .await
            .map_err(map_db_err)
    }

    #[instrument(name = "db.team.warn", skip(self, warning), fields(team_id = %team))]
    async fn append_team_warning(
        &mut self,
        tenant: Uuid,
        team: Uuid,
        warning: &TeamWarning,
    ) -> DbResult<()> {
        diesel::insert_into(team_warnings::table)
            .values(WriteDbTeamWarning {
                id: Uuid::new_v4(),
                tenant_id: tenant,
                team_id: team,
                incident_id: warning.incident_id,
                reason: warning.reason.clone(),
                issued_by: warning.issued_by,
                issued_at: warning.issued_at,
            })
            .execute(&mut self.conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}
