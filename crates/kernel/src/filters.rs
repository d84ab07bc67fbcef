//! List filters, sort-safety resolution, and pagination metadata.
//!
//! Column names and sort directions cannot be bound as query parameters, so
//! the `ORDER BY` fragment is only ever assembled from a [`SortOrder`], whose
//! column is a closed [`SortColumn`] enum carrying `&'static str` names.

use serde::Serialize;

use crate::validation::{Check, FieldErrors, RuleSet};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 12;
pub const MAX_PAGE: i64 = 1000;
pub const MAX_PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A closed set of columns a listing may be ordered by.
pub trait SortColumn: Copy + Eq + std::fmt::Debug + 'static {
    /// Every sortable column, in the order they are advertised.
    const ALL: &'static [Self];

    /// Column used to break ties so paging is stable.
    const TIEBREAK: Self;

    /// Column name as it appears in SQL.
    fn column(self) -> &'static str;

    fn from_column(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.column() == name)
    }

    /// Every accepted sort token: ascending names first, then `-` prefixed.
    fn safelist() -> Vec<String> {
        let ascending = Self::ALL.iter().map(|c| c.column().to_string());
        let descending = Self::ALL.iter().map(|c| format!("-{}", c.column()));
        ascending.chain(descending).collect()
    }
}

/// A verified sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder<C> {
    pub column: C,
    pub direction: SortDirection,
}

impl<C: SortColumn> SortOrder<C> {
    /// Parse a sort token such as `title` or `-published`.
    ///
    /// Returns `None` for anything outside the column allow-list.
    pub fn parse(token: &str) -> Option<Self> {
        let (name, direction) = match token.strip_prefix('-') {
            Some(name) => (name, SortDirection::Desc),
            None => (token, SortDirection::Asc),
        };
        C::from_column(name).map(|column| Self { column, direction })
    }

    /// Resolve a token that has already passed filter validation.
    ///
    /// # Panics
    ///
    /// Panics when the token is outside the allow-list. Validation rejects
    /// such tokens first, so reaching this is a programming error.
    pub fn resolve(token: &str) -> Self {
        match Self::parse(token) {
            Some(order) => order,
            None => panic!("unsafe sort parameter: {token:?}"),
        }
    }

    /// `ORDER BY` body, e.g. `title DESC, id ASC`.
    pub fn order_by(&self) -> String {
        if self.column == C::TIEBREAK {
            format!("{} {}", self.column.column(), self.direction.as_sql())
        } else {
            format!(
                "{} {}, {} ASC",
                self.column.column(),
                self.direction.as_sql(),
                C::TIEBREAK.column()
            )
        }
    }
}

/// Paging and ordering requested for a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub size: i64,
    pub sort: String,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            size: DEFAULT_PAGE_SIZE,
            sort: "id".to_string(),
        }
    }
}

impl Filters {
    pub fn limit(&self) -> i64 {
        self.size
    }

    /// Rows to skip; `page` is 1-indexed and must already be validated.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }

    /// See [`SortOrder::resolve`].
    pub fn sort_order<C: SortColumn>(&self) -> SortOrder<C> {
        SortOrder::resolve(&self.sort)
    }

    pub fn rules<C: SortColumn>() -> RuleSet<Filters> {
        let allowed = C::safelist().join(" ");
        RuleSet::new()
            .field(
                "page",
                vec![
                    Check::new(|f: &Filters| f.page >= 1, "must be greater than zero"),
                    Check::new(
                        |f: &Filters| f.page <= MAX_PAGE,
                        format!("must be a maximum of {MAX_PAGE}"),
                    ),
                ],
            )
            .field(
                "size",
                vec![
                    Check::new(|f: &Filters| f.size >= 1, "must be greater than zero"),
                    Check::new(
                        |f: &Filters| f.size <= MAX_PAGE_SIZE,
                        format!("must be a maximum of {MAX_PAGE_SIZE}"),
                    ),
                ],
            )
            .field(
                "sort",
                vec![Check::new(
                    |f: &Filters| SortOrder::<C>::parse(&f.sort).is_some(),
                    format!("can only contain values: {allowed}"),
                )],
            )
    }

    pub fn validate<C: SortColumn>(&self) -> FieldErrors {
        Self::rules::<C>().validate(self)
    }
}

/// Page bookkeeping derived from a total match count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaginationMetadata {
    pub current_page: i64,
    pub page_size: i64,
    pub first_page: i64,
    pub last_page: i64,
    pub total_records: i64,
}

impl PaginationMetadata {
    /// All fields are zero when nothing matched.
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records == 0 {
            return Self::default();
        }
        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}
