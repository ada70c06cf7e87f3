//! Particle variables: values fixed at release, indexed by pid.

use drift_core::{Column, ColumnError, ParticleId, Schema, Value};
use indexmap::IndexMap;

use crate::error::BatchError;

/// Append-only table of particle variables.
///
/// Row `k` belongs to pid `base + k`. Rows are never removed, so a
/// particle's release-time values remain available after it dies.
#[derive(Clone, Debug)]
pub struct ParticleTable {
    base: u64,
    len: usize,
    columns: IndexMap<String, Column>,
}

impl ParticleTable {
    /// An empty table for the schema's particle variables, whose first
    /// row will be pid `base`.
    pub fn new(schema: &Schema, base: ParticleId) -> Self {
        Self {
            base: base.0,
            len: 0,
            columns: schema
                .particle_variables()
                .map(|d| (d.name.clone(), Column::new(d.column_type)))
                .collect(),
        }
    }

    /// Number of particles ever recorded.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no particle has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The pid the next appended row must carry.
    pub fn next_pid(&self) -> ParticleId {
        ParticleId(self.base + self.len as u64)
    }

    /// The column of a particle variable, row `k` for pid `base + k`.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// One particle's value of a variable.
    pub fn get(&self, name: &str, pid: ParticleId) -> Option<Value> {
        let row = pid.0.checked_sub(self.base)?;
        self.columns.get(name)?.get(usize::try_from(row).ok()?)
    }

    /// Values of a float variable for the given pids, e.g. to align a
    /// particle variable with the live population.
    pub fn gather_float(&self, name: &str, pid: &[ParticleId]) -> Option<Vec<f64>> {
        let values = self.columns.get(name)?.as_float()?;
        pid.iter()
            .map(|p| values.get((p.0.checked_sub(self.base)?) as usize).copied())
            .collect()
    }

    /// Values of an integer variable for the given pids.
    pub fn gather_int(&self, name: &str, pid: &[ParticleId]) -> Option<Vec<i64>> {
        let values = self.columns.get(name)?.as_int()?;
        pid.iter()
            .map(|p| values.get((p.0.checked_sub(self.base)?) as usize).copied())
            .collect()
    }

    /// Check that a batch could be appended: pids continue the sequence
    /// without gaps and every column is a known particle variable of the
    /// right type and length.
    pub fn check_batch(
        &self,
        pid: &[ParticleId],
        columns: &IndexMap<String, Column>,
    ) -> Result<(), BatchError> {
        let n = pid.len();
        if let Some((k, &p)) = pid
            .iter()
            .enumerate()
            .find(|&(k, p)| p.0 != self.next_pid().0 + k as u64)
        {
            return Err(BatchError::PidSequence {
                expected: ParticleId(self.next_pid().0 + k as u64),
                found: p,
            });
        }
        for (name, col) in columns {
            let target = self
                .columns
                .get(name)
                .ok_or_else(|| BatchError::UnknownVariable { name: name.clone() })?;
            if col.len() != n {
                return Err(BatchError::Length {
                    name: name.clone(),
                    expected: n,
                    found: col.len(),
                });
            }
            if col.column_type() != target.column_type() {
                return Err(BatchError::Column {
                    name: name.clone(),
                    source: ColumnError::TypeMismatch {
                        expected: target.column_type(),
                        found: col.column_type(),
                    },
                });
            }
        }
        Ok(())
    }

    /// Record new particles. Missing variables are zero-filled. The
    /// batch is validated in full before anything is modified.
    pub fn append(
        &mut self,
        pid: &[ParticleId],
        columns: &IndexMap<String, Column>,
    ) -> Result<(), BatchError> {
        self.check_batch(pid, columns)?;
        let n = pid.len();
        for (name, col) in &mut self.columns {
            match columns.get(name) {
                Some(values) => col.extend_from(values).map_err(|source| BatchError::Column {
                    name: name.clone(),
                    source,
                })?,
                None => col.extend_zeros(n),
            }
        }
        self.len += n;
        Ok(())
    }
}
