//! store transaction methods for incidents

use crate::{PgTx, map_db_err, schema::incidents};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::{ExpressionMethods, Insertable, OptionalExtension, QueryDsl, Queryable};
use diesel_async::RunQueryDsl;
use engine_core::{DbError, DbResult, Incident, IncidentKind, IncidentSeverity, TxIncidents};
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Queryable)]
pub struct DbIncident {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tournament_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub affected_team_id: Option<Uuid>,
    pub kind: String,
    pub severity: String,
    pub title: String,
    pub description: String,
    pub reported_by: Uuid,
    pub data: serde_json::Value,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbIncident> for Incident {
    type Error = DbError;

    fn try_from(r: DbIncident) -> Result<Self, Self::Error> {
        Ok(Incident {
            id: r.id,
            tenant_id: r.tenant_id,
            tournament_id: r.tournament_id,
            match_id: r.match_id,
            affected_team_id: r.affected_team_id,
            kind: IncidentKind::try_from(r.kind.as_str()).map_err(DbError::Other)?,
            severity: IncidentSeverity::try_from(r.severity.as_str()).map_err(DbError::Other)?,
            title: r.title,
            description: r.description,
            reported_by: r.reported_by,
            created_at: r.created_at,
            data: r.data,
            resolved_by: r.resolved_by,
            resolved_at: r.resolved_at,
            resolution_notes: r.resolution_notes,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = incidents)]
pub struct WriteDbIncident {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tournament_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub affected_team_id: Option<Uuid>,
    pub kind: String,
    pub severity: String,
    pub title: String,
    pub description: String,
    pub reported_by: Uuid,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<&Incident> for WriteDbIncident {
    fn from(incident: &Incident) -> Self {
        WriteDbIncident {
            id: incident.id,
            tenant_id: incident.tenant_id,
            tournament_id: incident.tournament_id,
            match_id: incident.match_id,
            affected_team_id: incident.affected_team_id,
            kind: incident.kind.to_string(),
            severity: incident.severity.to_string(),
            title: incident.title.clone(),
            description: incident.description.clone(),
            reported_by: incident.reported_by,
            data: incident.data.clone(),
            created_at: incident.created_at,
        }
    }
}

#[async_trait]
impl TxIncidents for PgTx {
    #[instrument(name = "db.incident.insert", skip(self, incident), fields(id = %incident.id))]
    async fn insert_incident(&mut self, incident: &Incident) -> DbResult<()> {
        diesel::insert_into(incidents::table)
            .values(WriteDbIncident::from(incident))
            .execute(&mut self.conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    #[instrument(name = "db.incident.lock", skip(self), fields(id = %i_id))]
    async fn lock_incident(&mut self, tenant: Uuid, i_id: Uuid) -> DbResult<Option<Incident>> {
        let row = incidents::table
            .filter(incidents::tenant_id.eq(tenant))
            .filter(incidents::id.eq(i_id))
            .for_update()
            .first::<DbIncident>(&mut self.conn)
            .await
            .optional()
            .map_err(map_db_err)?;
        match row {
            Some(row) => {
                debug!("incident_locked");
                Ok(Some(row.try_into()?))
            }
            None => Ok(None),
        }
    }

    #[instrument(name = "db.incident.update", skip(self, incident), fields(id = %incident.id))]
    async fn update_incident(&mut self, incident: &Incident) -> DbResult<()> {
        let updated = diesel::update(
            incidents::table
                .filter(incidents::tenant_id.eq(incident.tenant_id))
                .filter(incidents::id.eq(incident.id)),
        )
        .set((
            incidents::severity.eq(incident.severity.to_string()),
            incidents::resolved_by.eq(incident.resolved_by),
            incidents::resolved_at.eq(incident.resolved_at),
            incidents::resolution_notes.eq(incident.resolution_notes.clone()),
        ))
        .execute(&mut self.conn)
        .await
        .map_err(map_db_err)?;
        if updated == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
