//! Catalog text format.
//!
//! ```text
//! number_of_objects,max_weight,max_size
//! weight,size,cost
//! weight,size,cost
//! ...
//! ```

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};

use crate::domain::model::{CapacityLimits, Catalog, Item, LoadedCatalog};
use crate::domain::ports::Storage;
use crate::utils::error::{EvalError, Result};

/// Reads catalogs through a [`Storage`] backend.
pub struct CatalogLoader<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> CatalogLoader<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub async fn load(&self, path: &str) -> Result<LoadedCatalog> {
        let bytes = self.storage.read_file(path).await?;
        let loaded = parse_catalog(path, &bytes)?;
        tracing::debug!(
            "Loaded catalog {} with {} items, limits {}/{}",
            path,
            loaded.catalog.len(),
            loaded.limits.max_weight,
            loaded.limits.max_size
        );
        Ok(loaded)
    }
}

/// Parses catalog text. `source_name` is only used in error messages.
///
/// Malformed records fail with [`EvalError::Parse`]; a header count that
/// differs from the number of item records fails with [`EvalError::Integrity`].
pub fn parse_catalog(source_name: &str, bytes: &[u8]) -> Result<LoadedCatalog> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    // whitespace-only lines survive as a single empty field after trimming
    let mut records = reader.records().filter(|record| match record {
        Ok(record) => !is_blank(record),
        Err(_) => true,
    });

    let header = match records.next() {
        Some(record) => record?,
        None => {
            return Err(EvalError::Parse {
                source_name: source_name.to_string(),
                line: 1,
                message: "missing header record".to_string(),
            })
        }
    };
    let [declared, max_weight, max_size] = parse_triple(source_name, &header)?;

    let mut items = Vec::new();
    for record in records {
        let record = record?;
        let [weight, size, cost] = parse_triple(source_name, &record)?;
        items.push(Item::new(weight, size, cost));
    }

    let declared = usize::try_from(declared).map_err(|_| EvalError::Parse {
        source_name: source_name.to_string(),
        line: line_of(&header),
        message: format!("object count {} is out of range", declared),
    })?;

    let catalog = Catalog::new(items, declared);
    catalog.verify_integrity()?;

    Ok(LoadedCatalog {
        catalog,
        limits: CapacityLimits::new(max_weight, max_size),
    })
}

fn is_blank(record: &StringRecord) -> bool {
    record.len() == 1 && record[0].is_empty()
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or(0)
}

fn parse_triple(source_name: &str, record: &StringRecord) -> Result<[u64; 3]> {
    if record.len() != 3 {
        return Err(EvalError::Parse {
            source_name: source_name.to_string(),
            line: line_of(record),
            message: format!("expected 3 fields, found {}", record.len()),
        });
    }

    let mut values = [0u64; 3];
    for (slot, field) in values.iter_mut().zip(record.iter()) {
        *slot = field.parse::<u64>().map_err(|e| EvalError::Parse {
            source_name: source_name.to_string(),
            line: line_of(record),
            message: format!("'{}' is not a non-negative integer: {}", field, e),
        })?;
    }
    Ok(values)
}

/// Renders a catalog back into its text format. The header count is the
/// catalog's declared count.
pub fn render_catalog(loaded: &LoadedCatalog) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record([
        loaded.catalog.expected_count.to_string(),
        loaded.limits.max_weight.to_string(),
        loaded.limits.max_size.to_string(),
    ])?;
    for item in &loaded.catalog.items {
        writer.write_record([
            item.weight.to_string(),
            item.size.to_string(),
            item.cost.to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| EvalError::ProcessingError {
        message: format!("failed to flush catalog writer: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| EvalError::ProcessingError {
        message: format!("catalog text is not UTF-8: {}", e),
    })
}

/// Rejects catalogs whose totals do not exceed twice the limits, i.e. ones where
/// nearly any selection is feasible.
pub fn check_difficulty(loaded: &LoadedCatalog) -> Result<()> {
    let total_weight = loaded.catalog.total_weight();
    let minimal_weight = loaded.limits.max_weight.saturating_mul(2);
    if total_weight <= minimal_weight {
        return Err(EvalError::CatalogTooEasy {
            dimension: "weight",
            minimal: minimal_weight,
            total: total_weight,
        });
    }

    let total_size = loaded.catalog.total_size();
    let minimal_size = loaded.limits.max_size.saturating_mul(2);
    if total_size <= minimal_size {
        return Err(EvalError::CatalogTooEasy {
            dimension: "size",
            minimal: minimal_size,
            total: total_size,
        });
    }

    Ok(())
}
