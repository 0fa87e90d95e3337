use std::fmt;

/// Steps of one site's pipeline, in order
///
/// Used to say where a site failed when it is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteStage {
    /// Stored ids, HTTP client and categories
    ResolveMetadata,

    /// Reading the total page count
    DeterminePages,

    Crawl,

    /// Filtering, appending and saving the dataset
    MergeAndPersist,

    Report,
}

impl SiteStage {
    /// All stages in execution order
    pub const ALL: [SiteStage; 5] = [
        Self::ResolveMetadata,
        Self::DeterminePages,
        Self::Crawl,
        Self::MergeAndPersist,
        Self::Report,
    ];
}

impl fmt::Display for SiteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResolveMetadata => "resolve metadata",
            Self::DeterminePages => "determine pages",
            Self::Crawl => "crawl",
            Self::MergeAndPersist => "merge and persist",
            Self::Report => "report",
        };
        f.write_str(name)
    }
}
