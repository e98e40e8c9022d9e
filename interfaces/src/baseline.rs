use anyhow::Result;
use anyhow::bail;

use crate::defs::Source;
use crate::defs::SourceId;
use crate::defs::SourceRegistry;

/// Fixed, ordered list of sources. Order is the order sources were added.
#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    sources: Vec<Source>,
}

impl StaticRegistry {
    pub fn new(sources: Vec<Source>) -> Result<Self> {
        let mut registry = Self::default();
        for source in sources {
            registry.add(source)?;
        }
        Ok(registry)
    }

    pub fn add(&mut self, source: Source) -> Result<()> {
        if self.get(&source.id).is_some() {
            bail!("duplicate source id: {}", source.id);
        }
        self.sources.push(source);
        Ok(())
    }

    pub fn get(&self, id: &SourceId) -> Option<&Source> {
        self.sources.iter().find(|source| &source.id == id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl SourceRegistry for StaticRegistry {
    fn list_sources(&self) -> Result<Vec<Source>> {
        Ok(self.sources.clone())
    }
}
