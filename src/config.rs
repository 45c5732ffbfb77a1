use swc_core::ecma::ast::EsVersion;

/// Settings for parsing, rewriting, and regenerating a script.
///
/// # Examples
///
/// ```rust
/// use deobfuscator_rs::Options;
///
/// let options = Options::default().with_minify(true).with_normalize_members(false);
/// assert!(options.minify);
/// assert!(!options.normalize_members);
/// assert!(!options.preserve_comments);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Rewrite `obj["name"]` into `obj.name` after decoding.
    pub normalize_members: bool,
    /// Emit compact output instead of one statement per line.
    pub minify: bool,
    /// Escape non-ASCII characters in emitted string literals.
    pub ascii_only: bool,
    /// Keep source comments in the regenerated code. Dropped by default.
    pub preserve_comments: bool,
    /// Language version used for both parsing and emission.
    pub target: EsVersion,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            normalize_members: true,
            minify: false,
            ascii_only: false,
            preserve_comments: false,
            target: EsVersion::latest(),
        }
    }
}

impl Options {
    pub fn with_normalize_members(mut self, normalize_members: bool) -> Self {
        self.normalize_members = normalize_members;
        self
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn with_ascii_only(mut self, ascii_only: bool) -> Self {
        self.ascii_only = ascii_only;
        self
    }

    pub fn with_preserve_comments(mut self, preserve_comments: bool) -> Self {
        self.preserve_comments = preserve_comments;
        self
    }

    pub fn with_target(mut self, target: EsVersion) -> Self {
        self.target = target;
        self
    }
}
