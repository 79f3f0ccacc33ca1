use serde::{Deserialize, Serialize};
use std::fmt;

/// Named toggle controlling reader/writer behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Reader: drop rows whose cells are all absent.
    SkipEmptyRows,
    /// Writer: fail on a field with no schema column instead of dropping it.
    FailOnUnmappedField,
    /// Reader: fail at construction when a column lies beyond the sheet's used area.
    FailOnMissingColumn,
    /// Reader and writer: empty or whitespace-only text counts as absent.
    /// Off by default so blank strings survive a write/read round trip.
    TreatBlankAsAbsent,
    /// Reader/writer: a value that does not fit the column type is an error
    /// rather than an in-band `#VALUE!` cell.
    FailOnInvalidCell,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::SkipEmptyRows,
        Feature::FailOnUnmappedField,
        Feature::FailOnMissingColumn,
        Feature::TreatBlankAsAbsent,
        Feature::FailOnInvalidCell,
    ];

    pub fn enabled_by_default(self) -> bool {
        Features::default().is_enabled(self)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Feature::SkipEmptyRows => "skip_empty_rows",
            Feature::FailOnUnmappedField => "fail_on_unmapped_field",
            Feature::FailOnMissingColumn => "fail_on_missing_column",
            Feature::TreatBlankAsAbsent => "treat_blank_as_absent",
            Feature::FailOnInvalidCell => "fail_on_invalid_cell",
        })
    }
}

/// Feature set shared by readers and writers.
///
/// Defaults are stable: every toggle is off. With all defaults a record
/// written and read back under the same schema comes back unchanged,
/// blank strings included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Features {
    pub skip_empty_rows: bool,
    pub fail_on_unmapped_field: bool,
    pub fail_on_missing_column: bool,
    pub treat_blank_as_absent: bool,
    pub fail_on_invalid_cell: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            skip_empty_rows: false,
            fail_on_unmapped_field: false,
            fail_on_missing_column: false,
            treat_blank_as_absent: false,
            fail_on_invalid_cell: false,
        }
    }
}

impl Features {
    /// Every check turned on. Blank handling stays as in the defaults.
    pub fn strict() -> Self {
        Self {
            skip_empty_rows: false,
            fail_on_unmapped_field: true,
            fail_on_missing_column: true,
            treat_blank_as_absent: false,
            fail_on_invalid_cell: true,
        }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::SkipEmptyRows => self.skip_empty_rows,
            Feature::FailOnUnmappedField => self.fail_on_unmapped_field,
            Feature::FailOnMissingColumn => self.fail_on_missing_column,
            Feature::TreatBlankAsAbsent => self.treat_blank_as_absent,
            Feature::FailOnInvalidCell => self.fail_on_invalid_cell,
        }
    }

    pub fn configure(&mut self, feature: Feature, state: bool) -> &mut Self {
        let slot = match feature {
            Feature::SkipEmptyRows => &mut self.skip_empty_rows,
            Feature::FailOnUnmappedField => &mut self.fail_on_unmapped_field,
            Feature::FailOnMissingColumn => &mut self.fail_on_missing_column,
            Feature::TreatBlankAsAbsent => &mut self.treat_blank_as_absent,
            Feature::FailOnInvalidCell => &mut self.fail_on_invalid_cell,
        };
        *slot = state;
        self
    }

    pub fn enable(&mut self, feature: Feature) -> &mut Self {
        self.configure(feature, true)
    }

    pub fn disable(&mut self, feature: Feature) -> &mut Self {
        self.configure(feature, false)
    }

    /// Owned variant of [`configure`](Self::configure) for chained construction.
    pub fn with(mut self, feature: Feature, state: bool) -> Self {
        self.configure(feature, state);
        self
    }

    /// Features currently turned on, in declaration order.
    pub fn enabled(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.into_iter().filter(|f| self.is_enabled(*f))
    }
}
