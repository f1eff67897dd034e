//! Post-fetch filtering shared by the listing functions.

use earth_catalog::ContinentType;
use uuid::Uuid;

/// Accepts a row when every non-empty list contains the row's value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentFilter<'a> {
    pub continent_types: &'a [ContinentType],
    pub parent_uuids: &'a [Uuid],
    pub uuids: &'a [Uuid],
}

impl<'a> ParentFilter<'a> {
    pub fn new(
        continent_types: &'a [ContinentType],
        parent_uuids: &'a [Uuid],
        uuids: &'a [Uuid],
    ) -> Self {
        Self {
            continent_types,
            parent_uuids,
            uuids,
        }
    }

    pub fn accepts(&self, continent_type: ContinentType, parent: &Uuid, uuid: &Uuid) -> bool {
        matches_any(self.continent_types, &continent_type)
            && matches_any(self.parent_uuids, parent)
            && matches_any(self.uuids, uuid)
    }
}

fn matches_any<T: PartialEq>(wanted: &[T], value: &T) -> bool {
    wanted.is_empty() || wanted.contains(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lists_accept_everything() {
        let filter = ParentFilter::default();
        assert!(filter.accepts(ContinentType::Asia, &Uuid::new_v4(), &Uuid::new_v4()));
    }

    #[test]
    fn every_non_empty_list_must_match() {
        let parent = Uuid::new_v4();
        let types = [ContinentType::Europe];
        let parents = [parent];
        let filter = ParentFilter::new(&types, &parents, &[]);

        assert!(filter.accepts(ContinentType::Europe, &parent, &Uuid::new_v4()));
        assert!(!filter.accepts(ContinentType::Asia, &parent, &Uuid::new_v4()));
        assert!(!filter.accepts(ContinentType::Europe, &Uuid::new_v4(), &Uuid::new_v4()));
    }
}
