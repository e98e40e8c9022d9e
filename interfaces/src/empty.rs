use crate::defs::Source;
use crate::defs::SourceRegistry;

pub struct EmptyRegistry;

impl SourceRegistry for EmptyRegistry {
    fn list_sources(&self) -> anyhow::Result<Vec<Source>> {
        // Nothing configured, every selection is the empty aggregation.
        Ok(vec![])
    }
}
