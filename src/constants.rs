/// Output column labels and fixed defaults shared across the pipeline stages

// Canonical output labels, in output order
pub const GRANT_NAME: &str = "Grant name";
pub const SPONSOR_ORG: &str = "Sponsor org";
pub const LINK: &str = "Link";
pub const AWARD_MAX: &str = "Award max";
pub const AWARD_MIN: &str = "Award min";
pub const FUNDING_INSTRUMENT: &str = "Funding instrument";
pub const ELIGIBILITY: &str = "Eligibility";
pub const PERIOD_OF_PERFORMANCE: &str = "Period of performance";
pub const DEADLINE: &str = "Deadline";
pub const TOTAL_FUNDING: &str = "Total funding";
pub const RELEVANCE: &str = "Relevance";
pub const FIT: &str = "EQORE Fit";
pub const EASE: &str = "Ease of Use";
pub const WEIGHTED_SCORE: &str = "Weighted Score";
pub const STATUS: &str = "Status";
pub const NOTES: &str = "Notes";
pub const SOURCE_FILE: &str = "Source file";

// Derived columns appended after the canonical set
pub const DAYS_TO_DEADLINE: &str = "Days to Deadline";
pub const EXPIRED: &str = "Expired";

pub const CANONICAL_COLUMNS: [&str; 17] = [
    GRANT_NAME,
    SPONSOR_ORG,
    LINK,
    AWARD_MAX,
    AWARD_MIN,
    FUNDING_INSTRUMENT,
    ELIGIBILITY,
    PERIOD_OF_PERFORMANCE,
    DEADLINE,
    TOTAL_FUNDING,
    RELEVANCE,
    FIT,
    EASE,
    WEIGHTED_SCORE,
    STATUS,
    NOTES,
    SOURCE_FILE,
];

pub const DERIVED_COLUMNS: [&str; 2] = [DAYS_TO_DEADLINE, EXPIRED];

/// Raw headers (normalized) that name computed columns; they are dropped on load
pub const RECOMPUTED_HEADERS: [&str; 4] = ["weighted score", "days to deadline", "expired", "source file"];

// Scoring defaults
pub const DEFAULT_WEIGHTS: (f64, f64, f64) = (0.4, 0.4, 0.2);
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 5.0;
pub const SCORE_DECIMALS: i32 = 3;

// Program dataset scoring
pub const PROGRAM_WEIGHTS: (f64, f64, f64) = (0.3, 0.3, 0.2);
pub const PROGRAM_SIGNAL_WEIGHT: f64 = 0.1;
pub const STACK_ALIGNED: f64 = 1.0;
pub const STACK_UNALIGNED: f64 = 0.2;
pub const CADENCE_HORIZON_DAYS: i64 = 365;

// Ingestion defaults
pub const DEFAULT_INPUT_DIR: &str = "data/csvs";
pub const DEFAULT_OUTPUT_CSV: &str = "out/master.csv";
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["csv", "tsv", "tab"];
pub const DEFAULT_TOP_N: usize = 5;

/// Characters kept on each side of a keyword hit when slicing page text
pub const KEYWORD_WINDOW: usize = 300;

/// Notes and unmapped-column fragments are joined with this separator
pub const NOTES_SEPARATOR: &str = " | ";
