// circle method round robin pairings

/// One pairing of a round robin schedule. `home` and `away` are indices into
/// the seed ordered team list of the group, with `home < away`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub round: u32,
    pub home: usize,
    pub away: usize,
}

/// All pairings for `team_count` teams using the circle method: position 0 is
/// fixed while the remaining positions rotate one step per round. An odd team
/// count plays against a sentinel bye whose pairings are discarded, so every
/// team pauses exactly once.
///
/// Deterministic: the input order fully determines the output. Rounds are
/// 1-based; an even team count yields `team_count - 1` rounds, an odd one
/// `team_count`.
pub fn round_robin(team_count: usize) -> Vec<Pairing> {
    if team_count < 2 {
        return Vec::new();
    }
    let has_bye = team_count % 2 == 1;
    let size = if has_bye { team_count + 1 } else { team_count };
    let bye = team_count;

    let mut wheel: Vec<usize> = (0..size).collect();
    let rounds = size - 1;
    let mut pairings = Vec::with_capacity(rounds * size / 2);
    for round in 0..rounds {
        for i in 0..size / 2 {
            let a = wheel[i];
            let b = wheel[size - 1 - i];
            if has_bye && (a == bye || b == bye) {
                continue;
            }
            pairings.push(Pairing {
                round: round as u32 + 1,
                home: a.min(b),
                away: a.max(b),
            });
        }
        wheel[1..].rotate_right(1);
    }
    pairings
}
