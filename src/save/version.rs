use crate::error::SaveFileError;
use semver::Version;

/// The last release that wrote save files without a checksum.
pub const LAST_UNCHECKED_RELEASE: Version = Version::new(0, 6, 1);

/// Files with a larger migration counter than this were always written with a checksum.
pub const LAST_UNCHECKED_MIGRATION: u32 = 4;

/// Parses a save file version, tolerating surrounding whitespace and a leading `v`.
pub fn parse_version(raw: &str) -> Result<Version, SaveFileError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).map_err(|source| SaveFileError::InvalidVersion {
        version: raw.to_string(),
        source,
    })
}

/// Whether a file without a checksum must have been edited by hand.
pub fn missing_checksum_is_suspicious(version: &Version, migration: Option<u32>) -> bool {
    *version > LAST_UNCHECKED_RELEASE || migration.unwrap_or(0) > LAST_UNCHECKED_MIGRATION
}
