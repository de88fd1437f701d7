use crate::{source::RawModuleEntry, value::ModuleValue};

/// One candidate descriptor with its origin.
#[derive(Debug, Clone)]
pub struct NormalizedEntry {
    pub path: String,
    /// Position inside the file's exported list; 0 for a single export.
    pub index: usize,
    pub value: ModuleValue,
}

/// Flatten every export into one entry per candidate descriptor.
///
/// Lists are expanded one level; anything else becomes a single entry.
pub fn normalize(entries: Vec<RawModuleEntry>) -> Vec<NormalizedEntry> {
    entries
        .into_iter()
        .flat_map(|RawModuleEntry { path, exported }| match exported {
            ModuleValue::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, value)| NormalizedEntry {
                    path: path.clone(),
                    index,
                    value,
                })
                .collect::<Vec<_>>(),
            value => vec![NormalizedEntry {
                path,
                index: 0,
                value,
            }],
        })
        .collect()
}
