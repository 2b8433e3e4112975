//! Exhaustive condition pool and its CSV representation.
//!
//! Absent roles are stored as `0` in both digit and location columns.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use csv::StringRecord;
use trialgen_core::errors::ErrorInfo;
use trialgen_core::{CandidateCondition, Placement, SingletonPresence, TrialgenError};

/// Column holding the presence flag.
pub const SINGLETON_PRESENT: &str = "SingletonPresent";

/// Read-only pool of candidate conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionPool {
    roles: usize,
    rows: Vec<CandidateCondition>,
}

impl ConditionPool {
    /// Builds a pool from explicit rows after checking their shape.
    pub fn from_rows(roles: usize, rows: Vec<CandidateCondition>) -> Result<Self, TrialgenError> {
        if roles < 2 {
            return Err(TrialgenError::Pool(
                ErrorInfo::new("pool-roles", "a pool needs at least two roles")
                    .with_context("roles", roles.to_string()),
            ));
        }
        for (index, row) in rows.iter().enumerate() {
            check_row(row, roles, index)?;
        }
        Ok(Self { roles, rows })
    }

    /// Enumerates every digit permutation crossed with every location
    /// permutation, singleton-present rows first.
    pub fn enumerate(n_digits: u8, n_locations: u8) -> Result<Self, TrialgenError> {
        if n_locations < 2 || n_digits < n_locations {
            return Err(TrialgenError::Pool(
                ErrorInfo::new("pool-shape", "need at least two locations and one digit per location")
                    .with_context("n_digits", n_digits.to_string())
                    .with_context("n_locations", n_locations.to_string()),
            ));
        }
        let digits: Vec<u8> = (1..=n_digits).collect();
        let locations: Vec<u8> = (1..=n_locations).collect();
        let roles = n_locations as usize;
        let digit_perms = permutations(&digits, roles);
        let location_perms = permutations(&locations, roles);

        let mut rows = Vec::with_capacity(2 * digit_perms.len() * location_perms.len());
        for presence in [SingletonPresence::Present, SingletonPresence::Absent] {
            for digit_perm in &digit_perms {
                for location_perm in &location_perms {
                    let mut placements = digit_perm
                        .iter()
                        .zip(location_perm.iter())
                        .map(|(digit, location)| Placement::new(*digit, *location));
                    let Some(target) = placements.next() else {
                        continue;
                    };
                    let singleton = if presence.is_present() {
                        placements.next()
                    } else {
                        None
                    };
                    rows.push(CandidateCondition {
                        target,
                        singleton,
                        non_singletons: placements.collect(),
                    });
                }
            }
        }
        Ok(Self { roles, rows })
    }

    /// Roles per trial (target, singleton slot and non-singletons).
    pub fn roles(&self) -> usize {
        self.roles
    }

    /// All rows in file order.
    pub fn rows(&self) -> &[CandidateCondition] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the pool has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows matching `presence`.
    pub fn subset(&self, presence: SingletonPresence) -> impl Iterator<Item = &CandidateCondition> {
        self.rows.iter().filter(move |row| row.presence() == presence)
    }

    /// Whether any row matches `presence`.
    pub fn has_presence(&self, presence: SingletonPresence) -> bool {
        self.subset(presence).next().is_some()
    }

    /// Writes the pool as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<(), TrialgenError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|err| TrialgenError::io("pool-mkdir", err, parent))?;
            }
        }
        let mut writer =
            csv::Writer::from_path(path).map_err(|err| TrialgenError::io("pool-open", err, path))?;
        writer
            .write_record(condition_headers(self.roles))
            .map_err(|err| TrialgenError::io("pool-write", err, path))?;
        for row in &self.rows {
            writer
                .write_record(condition_fields(row, self.roles))
                .map_err(|err| TrialgenError::io("pool-write", err, path))?;
        }
        writer
            .flush()
            .map_err(|err| TrialgenError::io("pool-flush", err, path))
    }

    /// Reads and validates a pool CSV. A missing file is a pool error.
    pub fn read_csv(path: &Path) -> Result<Self, TrialgenError> {
        if !path.is_file() {
            return Err(TrialgenError::Pool(
                ErrorInfo::new("pool-missing", "condition pool file not found")
                    .with_context("path", path.display().to_string())
                    .with_hint("generate one with `trialgen pool`"),
            ));
        }
        let mut reader =
            csv::Reader::from_path(path).map_err(|err| TrialgenError::io("pool-open", err, path))?;
        let headers = reader
            .headers()
            .map_err(|err| TrialgenError::io("pool-headers", err, path))?
            .clone();
        let columns = ConditionColumns::from_headers(&headers)?;
        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|err| TrialgenError::io("pool-read", err, path))?;
            rows.push(columns.parse(&record, index)?);
        }
        Self::from_rows(columns.roles(), rows).map_err(|err| match err {
            TrialgenError::Pool(info) => {
                TrialgenError::Pool(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }
}

fn check_row(row: &CandidateCondition, roles: usize, index: usize) -> Result<(), TrialgenError> {
    let filled = 1 + usize::from(row.singleton.is_some()) + row.non_singletons.len();
    if filled != roles {
        return Err(TrialgenError::Pool(
            ErrorInfo::new("pool-row-roles", "row does not fill every role")
                .with_context("row", index.to_string())
                .with_context("expected", roles.to_string())
                .with_context("found", filled.to_string()),
        ));
    }
    if !row.is_well_formed() {
        return Err(TrialgenError::Pool(
            ErrorInfo::new("pool-row-duplicate", "digits and locations must be distinct within a row")
                .with_context("row", index.to_string()),
        ));
    }
    Ok(())
}

/// Ordered `k`-permutations of `items`, lexicographic in input order.
fn permutations(items: &[u8], k: usize) -> Vec<Vec<u8>> {
    fn extend(items: &[u8], k: usize, used: &mut Vec<bool>, current: &mut Vec<u8>, out: &mut Vec<Vec<u8>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for index in 0..items.len() {
            if used[index] {
                continue;
            }
            used[index] = true;
            current.push(items[index]);
            extend(items, k, used, current, out);
            current.pop();
            used[index] = false;
        }
    }
    let mut out = Vec::new();
    if k <= items.len() {
        extend(items, k, &mut vec![false; items.len()], &mut Vec::with_capacity(k), &mut out);
    }
    out
}

/// Column names for a condition with `roles` roles.
pub fn condition_headers(roles: usize) -> Vec<String> {
    let mut headers = vec![
        SINGLETON_PRESENT.to_string(),
        "TargetDigit".to_string(),
        "TargetLoc".to_string(),
        "SingletonDigit".to_string(),
        "SingletonLoc".to_string(),
    ];
    for role in 1..roles {
        headers.push(format!("Non-Singleton{role}Digit"));
        headers.push(format!("Non-Singleton{role}Loc"));
    }
    headers
}

/// Field values matching [`condition_headers`].
pub fn condition_fields(condition: &CandidateCondition, roles: usize) -> Vec<String> {
    let mut fields = vec![
        u8::from(condition.singleton.is_some()).to_string(),
        condition.target.digit.to_string(),
        condition.target.location.to_string(),
    ];
    let singleton = condition.singleton.unwrap_or(Placement::new(0, 0));
    fields.push(singleton.digit.to_string());
    fields.push(singleton.location.to_string());
    let mut by_role = vec![Placement::new(0, 0); roles];
    for (role, placement) in condition.non_singleton_roles() {
        if role < roles {
            by_role[role] = placement;
        }
    }
    for placement in by_role.iter().skip(1) {
        fields.push(placement.digit.to_string());
        fields.push(placement.location.to_string());
    }
    fields
}

/// Column positions of the condition fields within a CSV header.
#[derive(Debug, Clone)]
pub struct ConditionColumns {
    present: usize,
    target: (usize, usize),
    singleton: (usize, usize),
    non_singletons: Vec<(usize, usize)>,
}

impl ConditionColumns {
    /// Locates the condition columns; extra columns are ignored.
    pub fn from_headers(headers: &StringRecord) -> Result<Self, TrialgenError> {
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(position, name)| (name.trim(), position))
            .collect();
        let column = |name: &str| {
            index.get(name).copied().ok_or_else(|| {
                TrialgenError::Pool(
                    ErrorInfo::new("pool-column", "required column is missing")
                        .with_context("column", name),
                )
            })
        };
        let present = column(SINGLETON_PRESENT)?;
        let target = (column("TargetDigit")?, column("TargetLoc")?);
        let singleton = (column("SingletonDigit")?, column("SingletonLoc")?);
        let mut non_singletons = Vec::new();
        let mut role = 1usize;
        while let (Some(digit), Some(location)) = (
            index.get(format!("Non-Singleton{role}Digit").as_str()).copied(),
            index.get(format!("Non-Singleton{role}Loc").as_str()).copied(),
        ) {
            non_singletons.push((digit, location));
            role += 1;
        }
        Ok(Self {
            present,
            target,
            singleton,
            non_singletons,
        })
    }

    /// Roles described by the header.
    pub fn roles(&self) -> usize {
        self.non_singletons.len() + 1
    }

    /// Parses one row.
    pub fn parse(&self, record: &StringRecord, row: usize) -> Result<CandidateCondition, TrialgenError> {
        let present = parse_flag(field(record, self.present, row)?, row)?;
        let target = parse_placement(record, self.target, row)?.ok_or_else(|| {
            TrialgenError::Pool(
                ErrorInfo::new("pool-row-target", "target digit and location are required")
                    .with_context("row", row.to_string()),
            )
        })?;
        let singleton = parse_placement(record, self.singleton, row)?;
        if present != singleton.is_some() {
            return Err(TrialgenError::Pool(
                ErrorInfo::new("pool-row-presence", "SingletonPresent disagrees with singleton columns")
                    .with_context("row", row.to_string()),
            ));
        }
        let mut non_singletons = Vec::new();
        for columns in &self.non_singletons {
            if let Some(placement) = parse_placement(record, *columns, row)? {
                non_singletons.push(placement);
            }
        }
        Ok(CandidateCondition {
            target,
            singleton,
            non_singletons,
        })
    }
}

fn field(record: &StringRecord, position: usize, row: usize) -> Result<&str, TrialgenError> {
    record.get(position).map(str::trim).ok_or_else(|| {
        TrialgenError::Pool(
            ErrorInfo::new("pool-row-short", "row has fewer fields than the header")
                .with_context("row", row.to_string()),
        )
    })
}

fn parse_flag(raw: &str, row: usize) -> Result<bool, TrialgenError> {
    match raw {
        "1" | "1.0" | "True" | "true" => Ok(true),
        "0" | "0.0" | "False" | "false" => Ok(false),
        other => Err(TrialgenError::Pool(
            ErrorInfo::new("pool-row-flag", "SingletonPresent must be 0 or 1")
                .with_context("row", row.to_string())
                .with_context("value", other),
        )),
    }
}

fn parse_number(raw: &str, row: usize) -> Result<u8, TrialgenError> {
    let trimmed = raw.strip_suffix(".0").unwrap_or(raw);
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed.parse::<u8>().map_err(|err| {
        TrialgenError::Pool(
            ErrorInfo::new("pool-row-number", err.to_string())
                .with_context("row", row.to_string())
                .with_context("value", raw),
        )
    })
}

fn parse_placement(
    record: &StringRecord,
    (digit_col, location_col): (usize, usize),
    row: usize,
) -> Result<Option<Placement>, TrialgenError> {
    let digit = parse_number(field(record, digit_col, row)?, row)?;
    let location = parse_number(field(record, location_col, row)?, row)?;
    match (digit, location) {
        (0, 0) => Ok(None),
        (0, _) | (_, 0) => Err(TrialgenError::Pool(
            ErrorInfo::new("pool-row-partial", "digit and location must both be set or both be 0")
                .with_context("row", row.to_string()),
        )),
        (digit, location) => Ok(Some(Placement::new(digit, location))),
    }
}
