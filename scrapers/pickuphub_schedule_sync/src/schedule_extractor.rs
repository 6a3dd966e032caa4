use crate::error::SyncError;

pub const SCHEDULE_START_MARKER: &str = "My Schedule";
pub const SCHEDULE_END_MARKER: &str = "Recommended Games";
pub const VENUE_DELIMITER: &str = "(Indoor)";
pub const NO_GAMES_SENTINEL: &str = "No scheduled games right now.";

/// Cuts the "My Schedule" section out of the page text and splits it into
/// one raw fragment per scheduled match, in page order.
pub fn extract_fragments(page_text: &str) -> Result<Vec<String>, SyncError> {
    let section = schedule_section(page_text)?;
    let mut pieces = section.split(VENUE_DELIMITER).peekable();

    // Exact match only: a partial hit on the sentinel must not hide real games.
    if pieces.peek() == Some(&NO_GAMES_SENTINEL) {
        return Ok(Vec::new());
    }

    Ok(pieces
        .filter(|piece| !piece.trim().is_empty())
        .map(str::to_string)
        .collect())
}

fn schedule_section(page_text: &str) -> Result<&str, SyncError> {
    let (_, after_start) = page_text.split_once(SCHEDULE_START_MARKER).ok_or_else(|| {
        SyncError::LayoutParse(format!("section marker {:?} not found", SCHEDULE_START_MARKER))
    })?;
    let (section, _) = after_start.split_once(SCHEDULE_END_MARKER).ok_or_else(|| {
        SyncError::LayoutParse(format!("section marker {:?} not found", SCHEDULE_END_MARKER))
    })?;
    Ok(section)
}
