//! Crown resolution: which single hippo currently leads on score.
//!
//! The crown is derived state. It is recomputed from scratch after every
//! mutation that touches a score or the live player set; a full scan is
//! cheap at the tens of players a match holds.

use std::collections::HashMap;

use crate::model::Hippo;
use crate::protocol::PlayerId;

/// Pick the crown holder among live hippos.
///
/// Highest score wins. Ties go to the hippo registered first. Hippos marked
/// eliminated are no longer candidates. Returns `None` when nobody is left.
pub fn resolve<'a>(hippos: impl IntoIterator<Item = &'a Hippo>) -> Option<PlayerId> {
    hippos
        .into_iter()
        .filter(|h| !h.is_eliminated)
        .min_by(|a, b| {
            b.player
                .score
                .cmp(&a.player.score)
                .then(a.registration_order.cmp(&b.registration_order))
        })
        .map(|h| h.id().clone())
}

/// Clear the crown on every hippo, then set it on `holder`.
///
/// Returns the number of hippos that end up crowned, which is 0 or 1 unless
/// `holder` names a hippo twice (impossible with a map).
pub fn apply(hippos: &mut HashMap<PlayerId, Hippo>, holder: Option<&PlayerId>) -> usize {
    for hippo in hippos.values_mut() {
        hippo.has_crown = false;
    }
    if let Some(hippo) = holder.and_then(|id| hippos.get_mut(id)) {
        hippo.has_crown = true;
    }
    hippos.values().filter(|h| h.has_crown).count()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::model::{Player, Side};

    fn hippo(id: &str, score: u64, order: u64) -> Hippo {
        Hippo {
            player: Player {
                id: PlayerId::new(id),
                name: id.to_string(),
                score,
                marble_count: 0,
                marbles: vec![],
            },
            side: Side::Top,
            has_crown: false,
            is_eliminated: false,
            won_bonus: false,
            registration_order: order,
        }
    }

    #[test]
    fn empty_roster_has_no_leader() {
        assert_eq!(resolve(std::iter::empty()), None);
    }

    #[test]
    fn highest_score_wins() {
        let hippos = [hippo("a", 3, 0), hippo("b", 9, 1), hippo("c", 4, 2)];
        assert_eq!(resolve(&hippos), Some(PlayerId::new("b")));
    }

    #[test]
    fn ties_go_to_first_registered() {
        let hippos = [hippo("late", 5, 7), hippo("early", 5, 2), hippo("low", 1, 0)];
        assert_eq!(resolve(&hippos), Some(PlayerId::new("early")));
    }

    #[test]
    fn eliminated_hippos_cannot_lead() {
        let mut top = hippo("top", 50, 0);
        top.is_eliminated = true;
        let hippos = [top, hippo("next", 10, 1)];
        assert_eq!(resolve(&hippos), Some(PlayerId::new("next")));
    }

    #[test]
    fn apply_leaves_exactly_one_crown() {
        let mut map: HashMap<_, _> = [hippo("a", 1, 0), hippo("b", 2, 1)]
            .into_iter()
            .map(|h| (h.id().clone(), h))
            .collect();
        map.get_mut(&PlayerId::new("a")).unwrap().has_crown = true;

        let crowned = apply(&mut map, Some(&PlayerId::new("b")));
        assert_eq!(crowned, 1);
        assert!(!map[&PlayerId::new("a")].has_crown);
        assert!(map[&PlayerId::new("b")].has_crown);

        assert_eq!(apply(&mut map, None), 0);
    }
}
