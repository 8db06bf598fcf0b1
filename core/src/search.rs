//! Client-side destination search.

use crate::types::DestinationRecord;

/// Records whose `property_name` or `location` contains `query`, ignoring
/// case, in their original order. A record with neither field never matches,
/// not even an empty query.
pub fn filter_destinations<'a, I>(records: I, query: &str) -> Vec<&'a DestinationRecord>
where
    I: IntoIterator<Item = &'a DestinationRecord>,
{
    let needle = query.to_lowercase();
    let hit = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|value| value.to_lowercase().contains(&needle))
    };
    records
        .into_iter()
        .filter(|record| hit(&record.property_name) || hit(&record.location))
        .collect()
}
