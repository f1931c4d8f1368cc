use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialName(pub String);

impl MaterialName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MaterialName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialPrice {
    pub material: MaterialName,
    pub cost_per_kg: f64,
}

/// Unit cost per kilogram keyed by exact, case-sensitive material name.
///
/// Entries keep the order in which they were loaded so that prompts list
/// materials the same way the price sheet does.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialPriceTable {
    entries: Vec<MaterialPrice>,
}

impl MaterialPriceTable {
    pub fn new(entries: Vec<MaterialPrice>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table.insert(entry.material, entry.cost_per_kg);
        }
        table
    }

    /// Inserts or replaces a price. A repeated name keeps its original position
    /// and takes the newer cost.
    pub fn insert(&mut self, material: MaterialName, cost_per_kg: f64) {
        match self.entries.iter_mut().find(|entry| entry.material == material) {
            Some(existing) => existing.cost_per_kg = cost_per_kg,
            None => self.entries.push(MaterialPrice { material, cost_per_kg }),
        }
    }

    pub fn get(&self, material: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.material.as_str() == material)
            .map(|entry| entry.cost_per_kg)
    }

    pub fn contains(&self, material: &str) -> bool {
        self.get(material).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.material.as_str())
    }

    pub fn entries(&self) -> &[MaterialPrice] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Comma separated material list, e.g. `ABS, PC, Nylon`.
    pub fn display_list(&self) -> String {
        self.names().collect::<Vec<_>>().join(", ")
    }
}

/// Builds a table from raw two-column rows (`material`, `cost`).
///
/// Rows with fewer than two cells are skipped. Names are trimmed and a cost
/// that does not parse as a finite, non-negative number is recorded as zero
/// instead of failing the whole load.
pub fn table_from_rows<R, C>(rows: R) -> MaterialPriceTable
where
    R: IntoIterator<Item = Vec<C>>,
    C: AsRef<str>,
{
    let mut table = MaterialPriceTable::default();
    for row in rows {
        if row.len() < 2 {
            continue;
        }
        let material = row[0].as_ref().trim();
        if material.is_empty() {
            continue;
        }
        table.insert(MaterialName(material.to_string()), parse_cost_cell(row[1].as_ref()));
    }
    table
}

pub fn parse_cost_cell(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => 0.0,
    }
}
