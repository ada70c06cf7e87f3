//! Live particle arrays: pids and instance variables.

use drift_core::column::retain_by_mask;
use drift_core::{Column, ColumnError, ColumnType, ParticleId, Schema};
use indexmap::IndexMap;

use crate::config::{VAR_X, VAR_Y, VAR_Z};
use crate::error::BatchError;

/// The live particle population.
///
/// One row per live particle. Positions (`X`, `Y`, `Z`) are stored as
/// dedicated arrays because every component touches them; other
/// instance variables are typed [`Column`]s keyed by name, fixed by the
/// schema at construction.
///
/// Every array is length- and order-aligned with the pid array at every
/// point observable through `&self`.
#[derive(Clone, Debug, Default)]
pub struct Population {
    pid: Vec<ParticleId>,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    alive: Vec<bool>,
    columns: IndexMap<String, Column>,
}

impl Population {
    /// An empty population holding the schema's instance variables.
    pub fn new(schema: &Schema) -> Self {
        let columns = schema
            .instance_variables()
            .filter(|d| !is_position(&d.name))
            .map(|d| (d.name.clone(), Column::new(d.column_type)))
            .collect();
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Number of live particles.
    pub fn len(&self) -> usize {
        self.pid.len()
    }

    /// Returns `true` if no particles are live.
    pub fn is_empty(&self) -> bool {
        self.pid.is_empty()
    }

    /// Particle identifiers, aligned with every other array.
    pub fn pid(&self) -> &[ParticleId] {
        &self.pid
    }

    /// Grid X coordinates.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Grid Y coordinates.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Depths in metres, positive downward.
    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Mutable `(X, Y, Z)`.
    pub fn positions_mut(&mut self) -> (&mut [f64], &mut [f64], &mut [f64]) {
        (&mut self.x, &mut self.y, &mut self.z)
    }

    /// Alive flags for the current step.
    pub fn alive(&self) -> &[bool] {
        &self.alive
    }

    /// Mutable alive flags. Clearing a flag removes the particle at the
    /// next compaction.
    pub fn alive_mut(&mut self) -> &mut [bool] {
        &mut self.alive
    }

    /// Set every alive flag.
    pub fn mark_all_alive(&mut self) {
        self.alive.fill(true);
    }

    /// Names of all instance variables, positions first.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        [VAR_X, VAR_Y, VAR_Z]
            .into_iter()
            .chain(self.columns.keys().map(String::as_str))
    }

    /// A float instance variable by name, including positions.
    pub fn float(&self, name: &str) -> Option<&[f64]> {
        match name {
            VAR_X => Some(&self.x),
            VAR_Y => Some(&self.y),
            VAR_Z => Some(&self.z),
            _ => self.columns.get(name)?.as_float(),
        }
    }

    /// Mutable float instance variable by name, including positions.
    pub fn float_mut(&mut self, name: &str) -> Option<&mut [f64]> {
        match name {
            VAR_X => Some(&mut self.x),
            VAR_Y => Some(&mut self.y),
            VAR_Z => Some(&mut self.z),
            _ => self.columns.get_mut(name)?.as_float_mut(),
        }
    }

    /// A non-position instance column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Mutable non-position instance column by name.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.get_mut(name)
    }

    /// An instance variable as a column, copying positions.
    pub fn column_owned(&self, name: &str) -> Option<Column> {
        match name {
            VAR_X | VAR_Y | VAR_Z => self.float(name).map(|v| Column::Float(v.to_vec())),
            _ => self.columns.get(name).cloned(),
        }
    }

    /// Check that a batch could be appended: every column is a known
    /// instance variable of the right type and length.
    pub fn check_batch(
        &self,
        pid: &[ParticleId],
        columns: &IndexMap<String, Column>,
    ) -> Result<(), BatchError> {
        let n = pid.len();
        for (name, col) in columns {
            if col.len() != n {
                return Err(BatchError::Length {
                    name: name.clone(),
                    expected: n,
                    found: col.len(),
                });
            }
            let target = if is_position(name) {
                ColumnType::Float
            } else {
                self.columns
                    .get(name)
                    .ok_or_else(|| BatchError::UnknownVariable { name: name.clone() })?
                    .column_type()
            };
            if col.column_type() != target {
                return Err(BatchError::Column {
                    name: name.clone(),
                    source: ColumnError::TypeMismatch {
                        expected: target,
                        found: col.column_type(),
                    },
                });
            }
        }
        Ok(())
    }

    /// Append new particles. Columns are instance variables by name;
    /// any variable absent from `columns` is zero-filled. New particles
    /// are alive.
    ///
    /// The batch is validated in full before anything is modified, so a
    /// rejected batch leaves the population unchanged.
    pub fn append(
        &mut self,
        pid: &[ParticleId],
        columns: &IndexMap<String, Column>,
    ) -> Result<(), BatchError> {
        self.check_batch(pid, columns)?;
        let n = pid.len();
        for (name, target) in [(VAR_X, &mut self.x), (VAR_Y, &mut self.y), (VAR_Z, &mut self.z)] {
            match columns.get(name).and_then(Column::as_float) {
                Some(values) => target.extend_from_slice(values),
                None => target.resize(target.len() + n, 0.0),
            }
        }
        for (name, col) in &mut self.columns {
            match columns.get(name) {
                Some(values) => col
                    .extend_from(values)
                    .map_err(|source| BatchError::Column {
                        name: name.clone(),
                        source,
                    })?,
                None => col.extend_zeros(n),
            }
        }
        self.pid.extend_from_slice(pid);
        self.alive.resize(self.alive.len() + n, true);
        Ok(())
    }

    /// Remove every particle whose alive flag is clear, preserving the
    /// order of survivors. Returns how many were removed.
    pub fn compact(&mut self) -> usize {
        let removed = self.alive.iter().filter(|a| !**a).count();
        if removed == 0 {
            return 0;
        }
        let keep = std::mem::take(&mut self.alive);
        retain_by_mask(&mut self.pid, &keep);
        retain_by_mask(&mut self.x, &keep);
        retain_by_mask(&mut self.y, &keep);
        retain_by_mask(&mut self.z, &keep);
        for col in self.columns.values_mut() {
            col.retain_mask(&keep);
        }
        self.alive = vec![true; self.pid.len()];
        removed
    }

    /// Check that every array has the pid array's length.
    pub fn check_invariants(&self) -> Result<(), String> {
        let n = self.pid.len();
        let lengths = [
            (VAR_X, self.x.len()),
            (VAR_Y, self.y.len()),
            (VAR_Z, self.z.len()),
            ("alive", self.alive.len()),
        ];
        for (name, len) in lengths
            .into_iter()
            .chain(self.columns.iter().map(|(k, c)| (k.as_str(), c.len())))
        {
            if len != n {
                return Err(format!("'{name}' has {len} entries for {n} particles"));
            }
        }
        Ok(())
    }
}

fn is_position(name: &str) -> bool {
    matches!(name, VAR_X | VAR_Y | VAR_Z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::VariableDef;
    use proptest::prelude::*;

    fn schema() -> Schema {
        Schema::new([
            VariableDef::instance("X"),
            VariableDef::instance("Y"),
            VariableDef::instance("Z"),
            VariableDef::instance("temp"),
            VariableDef::instance("stage").with_type(ColumnType::Int),
            VariableDef::particle("origin"),
        ])
        .unwrap()
    }

    fn pids(range: std::ops::Range<u64>) -> Vec<ParticleId> {
        range.map(ParticleId).collect()
    }

    fn batch(x: &[f64]) -> IndexMap<String, Column> {
        let mut cols = IndexMap::new();
        cols.insert("X".to_string(), Column::Float(x.to_vec()));
        cols.insert("Y".to_string(), Column::Float(vec![1.0; x.len()]));
        cols
    }

    #[test]
    fn particle_variables_are_not_columns() {
        let pop = Population::new(&schema());
        assert!(pop.column("origin").is_none());
        assert!(pop.column("temp").is_some());
        assert_eq!(
            pop.variable_names().collect::<Vec<_>>(),
            vec!["X", "Y", "Z", "temp", "stage"]
        );
    }

    #[test]
    fn append_zero_fills_missing_variables() {
        let mut pop = Population::new(&schema());
        pop.append(&pids(0..2), &batch(&[3.0, 4.0])).unwrap();
        assert_eq!(pop.x(), &[3.0, 4.0]);
        assert_eq!(pop.z(), &[0.0, 0.0]);
        assert_eq!(pop.float("temp").unwrap(), &[0.0, 0.0]);
        assert_eq!(pop.column("stage").unwrap().as_int().unwrap(), &[0, 0]);
        assert_eq!(pop.alive(), &[true, true]);
        pop.check_invariants().unwrap();
    }

    #[test]
    fn rejected_batch_leaves_population_unchanged() {
        let mut pop = Population::new(&schema());
        pop.append(&pids(0..1), &batch(&[1.0])).unwrap();

        let mut bad = batch(&[2.0, 3.0]);
        bad.insert("stage".to_string(), Column::Float(vec![1.0, 2.0]));
        assert!(matches!(
            pop.append(&pids(1..3), &bad),
            Err(BatchError::Column { .. })
        ));

        let mut short = batch(&[2.0, 3.0]);
        short.insert("temp".to_string(), Column::Float(vec![1.0]));
        assert!(matches!(
            pop.append(&pids(1..3), &short),
            Err(BatchError::Length { .. })
        ));

        let mut unknown = batch(&[2.0]);
        unknown.insert("origin".to_string(), Column::Float(vec![1.0]));
        assert!(matches!(
            pop.append(&pids(1..2), &unknown),
            Err(BatchError::UnknownVariable { .. })
        ));

        assert_eq!(pop.len(), 1);
        pop.check_invariants().unwrap();
    }

    #[test]
    fn compact_preserves_survivor_order() {
        let mut pop = Population::new(&schema());
        pop.append(&pids(0..5), &batch(&[0.0, 1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        pop.float_mut("temp")
            .unwrap()
            .copy_from_slice(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        pop.alive_mut()[1] = false;
        pop.alive_mut()[3] = false;

        assert_eq!(pop.compact(), 2);
        assert_eq!(pop.pid(), &[ParticleId(0), ParticleId(2), ParticleId(4)]);
        assert_eq!(pop.x(), &[0.0, 2.0, 4.0]);
        assert_eq!(pop.float("temp").unwrap(), &[10.0, 12.0, 14.0]);
        assert_eq!(pop.alive(), &[true, true, true]);
        pop.check_invariants().unwrap();
    }

    #[test]
    fn compact_with_nothing_dead_is_noop() {
        let mut pop = Population::new(&schema());
        pop.append(&pids(0..3), &batch(&[0.0, 1.0, 2.0])).unwrap();
        assert_eq!(pop.compact(), 0);
        assert_eq!(pop.len(), 3);
    }

    proptest! {
        #[test]
        fn arrays_stay_aligned(
            batches in prop::collection::vec(0usize..6, 1..8),
            kill_seed in any::<u64>(),
        ) {
            let mut pop = Population::new(&schema());
            let mut next = 0u64;
            for (round, n) in batches.into_iter().enumerate() {
                let x: Vec<f64> = (0..n).map(|k| (next + k as u64) as f64).collect();
                pop.append(&pids(next..next + n as u64), &batch(&x)).unwrap();
                next += n as u64;
                for (k, a) in pop.alive_mut().iter_mut().enumerate() {
                    *a = (kill_seed >> ((k + round) % 64)) & 1 == 0;
                }
                pop.compact();
                prop_assert!(pop.check_invariants().is_ok());
                // X was seeded with the pid, so alignment is observable.
                for (p, x) in pop.pid().iter().zip(pop.x()) {
                    prop_assert_eq!(p.0 as f64, *x);
                }
                prop_assert!(pop.pid().windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
