// Scanner report constants (no magic values)

/// Default scanner executable
pub const CLAMSCAN_CMD: &str = "clamscan";

/// Line separating per-file verdicts from the trailing summary
pub const SUMMARY_DELIMITER: &str = "----------- SCAN SUMMARY -----------";

/// Separator between path and verdict on a result line
pub const RESULT_SEPARATOR: &str = ": ";

/// Verdict for a clean file
pub const CLEAN_VERDICT: &str = "OK";

/// Marker appended to a detection name
pub const FOUND_MARKER: &str = " FOUND";

/// clamscan exit code when at least one infection was found
pub const INFECTED_EXIT_CODE: i32 = 1;

/// clamscan flag that suppresses the summary section
pub const NO_SUMMARY_FLAG: &str = "--no-summary";
