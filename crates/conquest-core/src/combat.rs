#![allow(clippy::needless_range_loop)]

use conquest_protocol::{AttackOutcome, CombatRound};
use tracing::debug;

use crate::GameRng;

pub const MAX_ATTACK_DICE: u32 = 3;
pub const MAX_DEFENSE_DICE: u32 = 2;

/// Fight `committed` attackers against `defenders` until one side is exhausted.
///
/// An empty territory falls without a round being thrown.
pub fn resolve_attack(committed: u32, defenders: u32, rng: &mut GameRng) -> AttackOutcome {
    let mut attackers_left = committed;
    let mut defenders_left = defenders;
    let mut rounds = Vec::new();

    while attackers_left > 0 && defenders_left > 0 {
        let mut attacker_dice = roll(rng, attackers_left.min(MAX_ATTACK_DICE));
        let mut defender_dice = roll(rng, defenders_left.min(MAX_DEFENSE_DICE));
        attacker_dice.sort_unstable_by(|a, b| b.cmp(a));
        defender_dice.sort_unstable_by(|a, b| b.cmp(a));

        let (attacker_losses, defender_losses) = compare_dice(&attacker_dice, &defender_dice);
        attackers_left -= attacker_losses;
        defenders_left -= defender_losses;
        rounds.push(CombatRound {
            attacker_dice,
            defender_dice,
        });
    }

    let outcome = AttackOutcome {
        attacker_losses: committed - attackers_left,
        defender_losses: defenders - defenders_left,
        captured: defenders_left == 0,
        rounds,
    };
    debug!(
        committed,
        defenders,
        captured = outcome.captured,
        rounds = outcome.rounds.len(),
        "combat resolved"
    );
    outcome
}

/// Whether `outcome` is a possible end of a battle between `committed` attackers and
/// `defenders` defenders.
pub fn outcome_is_consistent(outcome: &AttackOutcome, committed: u32, defenders: u32) -> bool {
    if outcome.captured {
        outcome.defender_losses == defenders && outcome.attacker_losses < committed
    } else {
        outcome.attacker_losses == committed && outcome.defender_losses < defenders
    }
}

/// Exact probability that `attackers` committed armies take a territory held by `defenders`.
pub fn capture_probability(attackers: u32, defenders: u32) -> f64 {
    if defenders == 0 {
        return 1.0;
    }
    if attackers == 0 {
        return 0.0;
    }

    let table = RoundTable::new();
    let a_max = attackers as usize;
    let d_max = defenders as usize;

    // win[a][d]: chance of capture with `a` attackers left against `d` defenders.
    let mut win = vec![vec![0.0_f64; d_max + 1]; a_max + 1];
    for a in 0..=a_max {
        win[a][0] = 1.0;
    }
    for a in 1..=a_max {
        for d in 1..=d_max {
            let dice_a = a.min(MAX_ATTACK_DICE as usize);
            let dice_d = d.min(MAX_DEFENSE_DICE as usize);
            let fights = dice_a.min(dice_d);
            let mut p = 0.0;
            for attacker_losses in 0..=fights {
                let chance = table.chance(dice_a, dice_d, attacker_losses);
                if chance == 0.0 {
                    continue;
                }
                let defender_losses = fights - attacker_losses;
                p += chance * win[a - attacker_losses][d - defender_losses];
            }
            win[a][d] = p;
        }
    }

    win[a_max][d_max].clamp(0.0, 1.0)
}

fn roll(rng: &mut GameRng, count: u32) -> Vec<u8> {
    (0..count).map(|_| rng.roll_die()).collect()
}

/// Losses of each side when comparing dice sorted highest first. Ties go to the defender.
fn compare_dice(attacker: &[u8], defender: &[u8]) -> (u32, u32) {
    attacker
        .iter()
        .zip(defender)
        .fold((0, 0), |(att, def), (a, d)| {
            if a > d {
                (att, def + 1)
            } else {
                (att + 1, def)
            }
        })
}

/// Distribution of attacker losses for every dice matchup, by exhaustive enumeration.
struct RoundTable {
    /// `[attacker dice - 1][defender dice - 1][attacker losses]`
    chances: [[[f64; 3]; 2]; 3],
}

impl RoundTable {
    fn new() -> Self {
        let mut chances = [[[0.0; 3]; 2]; 3];
        for dice_a in 1..=MAX_ATTACK_DICE as usize {
            for dice_d in 1..=MAX_DEFENSE_DICE as usize {
                let total = 6usize.pow((dice_a + dice_d) as u32);
                let mut counts = [0usize; 3];
                for code in 0..total {
                    let mut faces: Vec<u8> = (0..dice_a + dice_d)
                        .map(|i| (code / 6usize.pow(i as u32) % 6) as u8 + 1)
                        .collect();
                    let mut defender = faces.split_off(dice_a);
                    faces.sort_unstable_by(|a, b| b.cmp(a));
                    defender.sort_unstable_by(|a, b| b.cmp(a));
                    let (attacker_losses, _) = compare_dice(&faces, &defender);
                    counts[attacker_losses as usize] += 1;
                }
                for (losses, count) in counts.iter().enumerate() {
                    chances[dice_a - 1][dice_d - 1][losses] = *count as f64 / total as f64;
                }
            }
        }
        Self { chances }
    }

    fn chance(&self, dice_a: usize, dice_d: usize, attacker_losses: usize) -> f64 {
        self.chances[dice_a - 1][dice_d - 1][attacker_losses]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_die_duel_matches_closed_form() {
        // Attacker needs a strictly higher face: 15 of 36 pairs.
        let p = capture_probability(1, 1);
        assert!((p - 15.0 / 36.0).abs() < 1e-12);
    }

    #[test]
    fn probability_edges() {
        assert_eq!(capture_probability(0, 3), 0.0);
        assert_eq!(capture_probability(4, 0), 1.0);
        assert!(capture_probability(10, 1) > capture_probability(2, 1));
        assert!(capture_probability(2, 5) < capture_probability(2, 1));
    }

    #[test]
    fn round_table_rows_sum_to_one() {
        let table = RoundTable::new();
        for dice_a in 1..=3 {
            for dice_d in 1..=2 {
                let sum: f64 = (0..=2).map(|l| table.chance(dice_a, dice_d, l)).sum();
                assert!((sum - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn ties_favour_the_defender() {
        assert_eq!(compare_dice(&[6, 3], &[6, 2]), (1, 1));
        assert_eq!(compare_dice(&[5, 5, 1], &[4]), (0, 1));
        assert_eq!(compare_dice(&[2], &[2, 1]), (1, 0));
    }

    #[test]
    fn resolved_battles_end_in_a_consistent_shape() {
        let mut rng = GameRng::seed_from_u64(7);
        for committed in 1..6 {
            for defenders in 0..6 {
                let outcome = resolve_attack(committed, defenders, &mut rng);
                assert!(outcome_is_consistent(&outcome, committed, defenders));
                for round in &outcome.rounds {
                    assert!(round.attacker_dice.windows(2).all(|w| w[0] >= w[1]));
                    assert!(round.defender_dice.len() <= MAX_DEFENSE_DICE as usize);
                }
            }
        }
    }

    #[test]
    fn empty_territory_falls_without_rounds() {
        let mut rng = GameRng::seed_from_u64(1);
        let outcome = resolve_attack(2, 0, &mut rng);
        assert!(outcome.captured);
        assert_eq!(outcome.attacker_losses, 0);
        assert!(outcome.rounds.is_empty());
    }

    #[test]
    fn forced_outcomes_are_checked() {
        assert!(outcome_is_consistent(&AttackOutcome::forced_capture(0, 1), 2, 1));
        assert!(!outcome_is_consistent(&AttackOutcome::forced_capture(2, 1), 2, 1));
        assert!(outcome_is_consistent(&AttackOutcome::forced_repulse(2, 0), 2, 1));
        assert!(!outcome_is_consistent(&AttackOutcome::forced_repulse(1, 0), 2, 1));
    }
}
