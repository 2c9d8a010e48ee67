// single elimination bracket sizing and round naming

/// Smallest power of two holding `team_count` teams.
pub fn bracket_size(team_count: usize) -> usize {
    team_count.next_power_of_two().max(2)
}

/// One playoff round: `number` is the playoff local round (1-based), counting
/// from the widest round towards the final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketRound {
    pub number: u32,
    pub name: String,
    pub match_count: usize,
}

/// Rounds of a single elimination bracket for `team_count` advancing teams.
/// Teams receiving byes skip round 1; the shells still exist and are decided
/// as walkovers when the bracket is seeded.
pub fn bracket_rounds(team_count: usize) -> Vec<BracketRound> {
    let mut remaining = bracket_size(team_count);
    let mut rounds = Vec::new();
    let mut number = 1;
    while remaining > 1 {
        rounds.push(BracketRound {
            number,
            name: round_name(remaining),
            match_count: remaining / 2,
        });
        remaining /= 2;
        number += 1;
    }
    rounds
}

/// Standard Spanish round names by teams remaining.
pub fn round_name(remaining: usize) -> String {
    match remaining {
        2 => "Final".to_string(),
        4 => "Semifinales".to_string(),
        8 => "Cuartos de Final".to_string(),
        16 => "Octavos de Final".to_string(),
        32 => "Dieciseisavos".to_string(),
        n => format!("Ronda de {n}"),
    }
}

/// Seed occupying each first round slot, 1-based, built by the classic fold:
/// slots 2k and 2k+1 form match k+1, and the top seeds can only meet in the
/// final. For size 8 this yields [1, 8, 4, 5, 2, 7, 3, 6].
pub fn seeding_order(bracket_size: usize) -> Vec<usize> {
    debug_assert!(bracket_size.is_power_of_two());
    let mut order = vec![1usize];
    let mut size = 1;
    while size < bracket_size {
        size *= 2;
        let mut next = Vec::with_capacity(size);
        for seed in &order {
            next.push(*seed);
            next.push(size + 1 - seed);
        }
        order = next;
    }
    order
}
