//! Display order of the team members.
//!
//! Each member points to the member displayed just above it (`id_above`), the first one points
//! to [`TOP`]. A valid chain has exactly one member per `id_above` value and reaches every member
//! from the top.
//!
//! The edit operations check the chain first and then return the pointer writes that the content
//! store must perform. They never touch more than the moved node and its two neighbours.

use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::Display;

use log::{debug, error};

/// The `id_above` value of the first member.
pub const TOP: &str = "0";

/// Anything that is part of the roster chain.
pub trait Linked {
    fn id(&self) -> &str;
    fn id_above(&self) -> &str;
}

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct ChainLink {
    pub id: String,
    pub id_above: String,
}

impl ChainLink {
    pub fn new(id: &str, id_above: &str) -> ChainLink {
        ChainLink {
            id: id.to_string(),
            id_above: id_above.to_string(),
        }
    }
}

impl Linked for ChainLink {
    fn id(&self) -> &str {
        &self.id
    }
    fn id_above(&self) -> &str {
        &self.id_above
    }
}

/// A pointer update: `id` must now be displayed below `id_above`.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct PointerWrite {
    pub id: String,
    pub id_above: String,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ChainError {
    /// No member is at the top of a non-empty list.
    MissingHead,
    MultipleHeads(Vec<String>),
    DuplicateId(String),
    /// The top marker cannot be used as a member id.
    ReservedId,
    DuplicatePredecessor {
        above: String,
        ids: Vec<String>,
    },
    DanglingPredecessor {
        id: String,
        above: String,
    },
    /// Members that cannot be reached from the top: orphans or cycles.
    Unreachable(Vec<String>),
    UnknownMember(String),
    SelfReference(String),
}

impl Error for ChainError {}

impl Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainError::MissingHead => write!(f, "no member at the top of the list"),
            ChainError::MultipleHeads(ids) => write!(f, "several members at the top: {:?}", ids),
            ChainError::DuplicateId(id) => write!(f, "member {} appears twice", id),
            ChainError::ReservedId => write!(f, "{:?} cannot be used as a member id", TOP),
            ChainError::DuplicatePredecessor { above, ids } => {
                write!(f, "members {:?} are all below {}", ids, above)
            }
            ChainError::DanglingPredecessor { id, above } => {
                write!(f, "member {} is below unknown member {}", id, above)
            }
            ChainError::Unreachable(ids) => {
                write!(f, "members {:?} cannot be reached from the top", ids)
            }
            ChainError::UnknownMember(id) => write!(f, "unknown member {}", id),
            ChainError::SelfReference(id) => write!(f, "member {} cannot be below itself", id),
        }
    }
}

/// A validated roster chain, indexed in both directions.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RosterChain {
    // id -> id_above
    above: HashMap<String, String>,
    // id_above -> id
    below: HashMap<String, String>,
}

impl RosterChain {
    pub fn new<T: Linked>(members: &[T]) -> Result<RosterChain, ChainError> {
        let mut above: HashMap<String, String> = HashMap::new();
        for m in members.iter() {
            if m.id() == TOP {
                return Err(ChainError::ReservedId);
            }
            if m.id() == m.id_above() {
                return Err(ChainError::SelfReference(m.id().to_string()));
            }
            if above
                .insert(m.id().to_string(), m.id_above().to_string())
                .is_some()
            {
                return Err(ChainError::DuplicateId(m.id().to_string()));
            }
        }
        RosterChain::from_above(above)
    }

    fn from_above(above: HashMap<String, String>) -> Result<RosterChain, ChainError> {
        let mut claims: HashMap<&str, Vec<String>> = HashMap::new();
        for (id, id_above) in above.iter() {
            if id_above != TOP && !above.contains_key(id_above) {
                return Err(ChainError::DanglingPredecessor {
                    id: id.clone(),
                    above: id_above.clone(),
                });
            }
            claims.entry(id_above.as_str()).or_default().push(id.clone());
        }
        for (id_above, ids) in claims.iter_mut() {
            if ids.len() > 1 {
                ids.sort();
                if *id_above == TOP {
                    return Err(ChainError::MultipleHeads(ids.clone()));
                }
                return Err(ChainError::DuplicatePredecessor {
                    above: id_above.to_string(),
                    ids: ids.clone(),
                });
            }
        }
        let below: HashMap<String, String> = above
            .iter()
            .map(|(id, id_above)| (id_above.clone(), id.clone()))
            .collect();
        if !above.is_empty() && !below.contains_key(TOP) {
            return Err(ChainError::MissingHead);
        }
        let chain = RosterChain { above, below };
        let reached: HashSet<String> = chain.order().into_iter().collect();
        if reached.len() < chain.above.len() {
            let mut lost: Vec<String> = chain
                .above
                .keys()
                .filter(|id| !reached.contains(*id))
                .cloned()
                .collect();
            lost.sort();
            return Err(ChainError::Unreachable(lost));
        }
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.above.len()
    }

    pub fn is_empty(&self) -> bool {
        self.above.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.above.contains_key(id)
    }

    pub fn id_above(&self, id: &str) -> Option<&str> {
        self.above.get(id).map(|s| s.as_str())
    }

    pub fn id_below(&self, id: &str) -> Option<&str> {
        self.below.get(id).map(|s| s.as_str())
    }

    /// The ids from the top to the bottom.
    pub fn order(&self) -> Vec<String> {
        let mut res: Vec<String> = Vec::new();
        let mut cur = TOP;
        // Bounded by the number of members in case of a cycle.
        while res.len() < self.above.len() {
            match self.below.get(cur) {
                Some(next) => {
                    res.push(next.clone());
                    cur = next.as_str();
                }
                None => break,
            }
        }
        res
    }

    /// The last member, or `TOP` for an empty list.
    pub fn tail(&self) -> String {
        self.order().pop().unwrap_or_else(|| TOP.to_string())
    }

    fn check_position(&self, id_above: &str) -> Result<(), ChainError> {
        if id_above == TOP || self.contains(id_above) {
            Ok(())
        } else {
            Err(ChainError::UnknownMember(id_above.to_string()))
        }
    }

    fn check_member(&self, id: &str) -> Result<(), ChainError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(ChainError::UnknownMember(id.to_string()))
        }
    }

    fn apply(&mut self, writes: &[PointerWrite]) -> Result<(), ChainError> {
        let mut above = self.above.clone();
        for w in writes.iter() {
            above.insert(w.id.clone(), w.id_above.clone());
        }
        *self = RosterChain::from_above(above)?;
        Ok(())
    }

    /// Adds a new member just below `id_above`.
    pub fn insert_after(
        &mut self,
        id: &str,
        id_above: &str,
    ) -> Result<Vec<PointerWrite>, ChainError> {
        if id == TOP {
            return Err(ChainError::ReservedId);
        }
        if self.contains(id) {
            return Err(ChainError::DuplicateId(id.to_string()));
        }
        if id == id_above {
            return Err(ChainError::SelfReference(id.to_string()));
        }
        self.check_position(id_above)?;
        let mut writes = vec![PointerWrite {
            id: id.to_string(),
            id_above: id_above.to_string(),
        }];
        if let Some(next) = self.id_below(id_above) {
            writes.push(PointerWrite {
                id: next.to_string(),
                id_above: id.to_string(),
            });
        }
        self.apply(&writes)?;
        debug!("insert_after: {} below {}: {:?}", id, id_above, writes);
        Ok(writes)
    }

    /// Adds a new member at the bottom of the list.
    pub fn append(&mut self, id: &str) -> Result<Vec<PointerWrite>, ChainError> {
        let tail = self.tail();
        self.insert_after(id, &tail)
    }

    /// Removes a member; the member below it takes its place.
    pub fn remove(&mut self, id: &str) -> Result<Vec<PointerWrite>, ChainError> {
        self.check_member(id)?;
        let id_above = self.above[id].clone();
        let mut writes: Vec<PointerWrite> = Vec::new();
        if let Some(next) = self.id_below(id) {
            writes.push(PointerWrite {
                id: next.to_string(),
                id_above: id_above.clone(),
            });
        }
        let mut above = self.above.clone();
        above.remove(id);
        for w in writes.iter() {
            above.insert(w.id.clone(), w.id_above.clone());
        }
        *self = RosterChain::from_above(above)?;
        debug!("remove: {}: {:?}", id, writes);
        Ok(writes)
    }

    /// Moves a member just below `new_above`. Moving a member to its current place does not
    /// write anything.
    pub fn move_after(
        &mut self,
        id: &str,
        new_above: &str,
    ) -> Result<Vec<PointerWrite>, ChainError> {
        self.check_member(id)?;
        self.check_position(new_above)?;
        if id == new_above {
            return Err(ChainError::SelfReference(id.to_string()));
        }
        let old_above = self.above[id].clone();
        if old_above == new_above {
            return Ok(Vec::new());
        }
        let mut writes = vec![PointerWrite {
            id: id.to_string(),
            id_above: new_above.to_string(),
        }];
        if let Some(new_below) = self.id_below(new_above) {
            writes.push(PointerWrite {
                id: new_below.to_string(),
                id_above: id.to_string(),
            });
        }
        if let Some(old_below) = self.id_below(id) {
            writes.push(PointerWrite {
                id: old_below.to_string(),
                id_above: old_above,
            });
        }
        self.apply(&writes)?;
        debug!("move_after: {} below {}: {:?}", id, new_above, writes);
        Ok(writes)
    }

    /// Rebuilds the chain to follow the given order. Only the pointers that change are returned.
    pub fn relink(&mut self, order: &[String]) -> Result<Vec<PointerWrite>, ChainError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for id in order.iter() {
            self.check_member(id)?;
            if !seen.insert(id.as_str()) {
                return Err(ChainError::DuplicateId(id.clone()));
            }
        }
        if seen.len() < self.len() {
            let mut missing: Vec<String> = self
                .above
                .keys()
                .filter(|id| !seen.contains(id.as_str()))
                .cloned()
                .collect();
            missing.sort();
            return Err(ChainError::Unreachable(missing));
        }
        let mut writes: Vec<PointerWrite> = Vec::new();
        let mut prev = TOP.to_string();
        for id in order.iter() {
            if self.above[id] != prev {
                writes.push(PointerWrite {
                    id: id.clone(),
                    id_above: prev.clone(),
                });
            }
            prev = id.clone();
        }
        self.apply(&writes)?;
        Ok(writes)
    }
}

/// Lists the members from the top of the chain to the bottom.
pub fn reconstruct<T: Linked>(members: &[T]) -> Result<Vec<&T>, ChainError> {
    let chain = RosterChain::new(members)?;
    let by_id: HashMap<&str, &T> = members.iter().map(|m| (m.id(), m)).collect();
    Ok(chain
        .order()
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).cloned())
        .collect())
}

/// Same as `reconstruct`, but keeps the input order if the chain is broken.
pub fn sort_members<T: Linked + Clone>(members: &[T]) -> Vec<T> {
    match reconstruct(members) {
        Ok(sorted) => sorted.into_iter().cloned().collect(),
        Err(e) => {
            error!("sort_members: broken roster chain, keeping the stored order: {}", e);
            members.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(v: &[(&str, &str)]) -> Vec<ChainLink> {
        v.iter().map(|(id, above)| ChainLink::new(id, above)).collect()
    }

    fn abc() -> RosterChain {
        RosterChain::new(&links(&[("b", "a"), ("c", "b"), ("a", "0")])).unwrap()
    }

    fn w(id: &str, above: &str) -> PointerWrite {
        PointerWrite {
            id: id.to_string(),
            id_above: above.to_string(),
        }
    }

    #[test]
    fn reconstruct_order() {
        let members = links(&[("a", "0"), ("b", "a"), ("c", "b")]);
        let ids: Vec<&str> = reconstruct(&members)
            .unwrap()
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(RosterChain::new::<ChainLink>(&[]).unwrap().tail(), TOP);
    }

    #[test]
    fn cycle_falls_back_to_input_order() {
        // a is above c and c is at the top of nothing.
        let members = links(&[("a", "c"), ("b", "a"), ("c", "b")]);
        assert_eq!(reconstruct(&members).err(), Some(ChainError::MissingHead));
        assert_eq!(sort_members(&members), members);

        let members = links(&[("x", "0"), ("a", "c"), ("b", "a"), ("c", "b")]);
        assert_eq!(
            reconstruct(&members).err(),
            Some(ChainError::Unreachable(vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string()
            ]))
        );
        assert_eq!(sort_members(&members), members);
    }

    #[test]
    fn broken_chains() {
        assert_eq!(
            RosterChain::new(&links(&[("a", "0"), ("b", "0")])).err(),
            Some(ChainError::MultipleHeads(vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(
            RosterChain::new(&links(&[("a", "0"), ("b", "a"), ("c", "a")])).err(),
            Some(ChainError::DuplicatePredecessor {
                above: "a".to_string(),
                ids: vec!["b".to_string(), "c".to_string()]
            })
        );
        assert_eq!(
            RosterChain::new(&links(&[("a", "0"), ("b", "zz")])).err(),
            Some(ChainError::DanglingPredecessor {
                id: "b".to_string(),
                above: "zz".to_string()
            })
        );
        assert_eq!(
            RosterChain::new(&links(&[("a", "0"), ("a", "0")])).err(),
            Some(ChainError::DuplicateId("a".to_string()))
        );
    }

    #[test]
    fn insert_and_append() {
        let mut chain = abc();
        assert_eq!(chain.insert_after("x", "a").unwrap(), vec![w("x", "a"), w("b", "x")]);
        assert_eq!(chain.order(), vec!["a", "x", "b", "c"]);
        assert_eq!(chain.append("y").unwrap(), vec![w("y", "c")]);
        assert_eq!(chain.tail(), "y");
        assert_eq!(chain.insert_after("z", "0").unwrap(), vec![w("z", "0"), w("a", "z")]);
        assert_eq!(chain.order(), vec!["z", "a", "x", "b", "c", "y"]);
        assert_eq!(
            chain.insert_after("a", "0").err(),
            Some(ChainError::DuplicateId("a".to_string()))
        );
    }

    #[test]
    fn remove_splices() {
        let mut chain = abc();
        assert_eq!(chain.remove("b").unwrap(), vec![w("c", "a")]);
        assert_eq!(chain.order(), vec!["a", "c"]);
        assert_eq!(chain.remove("c").unwrap(), Vec::<PointerWrite>::new());
        assert_eq!(chain.remove("a").unwrap(), Vec::<PointerWrite>::new());
        assert!(chain.is_empty());
        assert_eq!(
            chain.remove("a").err(),
            Some(ChainError::UnknownMember("a".to_string()))
        );
    }

    #[test]
    fn move_to_top() {
        let mut chain = abc();
        let writes = chain.move_after("c", "0").unwrap();
        assert_eq!(writes, vec![w("c", "0"), w("a", "c")]);
        assert_eq!(chain.order(), vec!["c", "a", "b"]);
    }

    #[test]
    fn move_down_by_one() {
        let mut chain = abc();
        let writes = chain.move_after("a", "b").unwrap();
        assert_eq!(writes, vec![w("a", "b"), w("c", "a"), w("b", "0")]);
        assert_eq!(chain.order(), vec!["b", "a", "c"]);
    }

    #[test]
    fn move_in_place_and_invalid_moves() {
        let mut chain = abc();
        assert_eq!(chain.move_after("b", "a").unwrap(), Vec::<PointerWrite>::new());
        assert_eq!(
            chain.move_after("b", "b").err(),
            Some(ChainError::SelfReference("b".to_string()))
        );
        assert_eq!(
            chain.move_after("b", "q").err(),
            Some(ChainError::UnknownMember("q".to_string()))
        );
        // Failed operations leave the chain untouched.
        assert_eq!(chain.order(), vec!["a", "b", "c"]);
    }

    #[test]
    fn relink_from_order() {
        let mut chain = abc();
        let order: Vec<String> = ["c", "b", "a"].iter().map(|s| s.to_string()).collect();
        let writes = chain.relink(&order).unwrap();
        assert_eq!(writes, vec![w("c", "0"), w("b", "c"), w("a", "b")]);
        assert_eq!(chain.order(), order);
        assert_eq!(
            chain.relink(&order[..2]).err(),
            Some(ChainError::Unreachable(vec!["a".to_string()]))
        );
    }
}
