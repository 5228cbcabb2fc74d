//! `getopt` / `getopt_long` style option scanning.
//!
//! This crate is intentionally small so it can sit underneath every command:
//! - [`table::OptionTable`] turns a short-option spec string (`"ab:c::"`) and a
//!   list of long options into lookup maps
//! - [`scan::Scanner`] walks an argument vector against a table and collects the
//!   parsed options, the positional arguments and every scan error it meets

pub mod table {
    use indexmap::IndexMap;

    /// One recognized option.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct OptionSpec {
        /// Canonical identifier reported back to callers.
        pub key: String,
        /// Option name (a single character for short options).
        pub name: String,
        pub has_arg: bool,
        /// Only meaningful when `has_arg` is set.
        pub arg_is_optional: bool,
    }

    impl OptionSpec {
        fn short(c: char, has_arg: bool, arg_is_optional: bool) -> Self {
            Self {
                key: c.to_string(),
                name: c.to_string(),
                has_arg,
                arg_is_optional: has_arg && arg_is_optional,
            }
        }
    }

    /// A long option descriptor (`--name`), as handed to `getopt_long`.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LongOption {
        pub name: String,
        pub key: String,
        pub has_arg: bool,
        pub arg_is_optional: bool,
    }

    impl LongOption {
        /// A long option without an argument, reported under `key`.
        pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                key: key.into(),
                has_arg: false,
                arg_is_optional: false,
            }
        }

        /// Require an argument in the next token (`--out file`).
        pub fn with_arg(mut self) -> Self {
            self.has_arg = true;
            self
        }

        /// Declare the argument optional.
        ///
        /// The scanner never defaults a long option's argument, so this only
        /// affects what [`OptionTable::long`] reports.
        pub fn with_optional_arg(mut self) -> Self {
            self.has_arg = true;
            self.arg_is_optional = true;
            self
        }
    }

    /// Short and long option lookup maps.
    ///
    /// A key may appear in both maps (`-v` / `--verbose` sharing `"v"`).
    #[derive(Debug, Clone, Default)]
    pub struct OptionTable {
        short: IndexMap<char, OptionSpec>,
        long: IndexMap<String, OptionSpec>,
    }

    impl OptionTable {
        /// Build a table from a `getopt` spec string and `getopt_long` descriptors.
        ///
        /// Every character other than `:` starts an option; one trailing `:`
        /// means it takes an argument, a second one makes that argument
        /// optional. Duplicate long names overwrite earlier ones.
        pub fn new(short_spec: &str, long_options: &[LongOption]) -> Self {
            let mut long = IndexMap::new();
            for opt in long_options {
                long.insert(
                    opt.name.clone(),
                    OptionSpec {
                        key: opt.key.clone(),
                        name: opt.name.clone(),
                        has_arg: opt.has_arg,
                        arg_is_optional: opt.has_arg && opt.arg_is_optional,
                    },
                );
            }
            Self {
                short: parse_short_spec(short_spec),
                long,
            }
        }

        /// Build a table with short options only.
        pub fn from_short(short_spec: &str) -> Self {
            Self::new(short_spec, &[])
        }

        pub fn short(&self, c: char) -> Option<&OptionSpec> {
            self.short.get(&c)
        }

        pub fn long(&self, name: &str) -> Option<&OptionSpec> {
            self.long.get(name)
        }

        /// Short options in spec order.
        pub fn short_options(&self) -> impl Iterator<Item = &OptionSpec> {
            self.short.values()
        }

        /// Long options in declaration order.
        pub fn long_options(&self) -> impl Iterator<Item = &OptionSpec> {
            self.long.values()
        }
    }

    fn parse_short_spec(spec: &str) -> IndexMap<char, OptionSpec> {
        let mut out = IndexMap::new();
        let mut chars = spec.chars().peekable();
        while let Some(c) = chars.next() {
            // A colon with no option character in front of it names nothing.
            if c == ':' {
                continue;
            }
            let has_arg = chars.next_if_eq(&':').is_some();
            let arg_is_optional = has_arg && chars.next_if_eq(&':').is_some();
            out.insert(c, OptionSpec::short(c, has_arg, arg_is_optional));
        }
        out
    }
}

pub mod scan {
    use super::table::{OptionSpec, OptionTable};
    use indexmap::IndexMap;
    use std::fmt;

    /// One matched occurrence of an option.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ParsedOption {
        pub value: Option<String>,
        /// The option was present but carried no explicit argument.
        pub is_default: bool,
    }

    impl ParsedOption {
        fn flag() -> Self {
            Self {
                value: None,
                is_default: true,
            }
        }

        fn explicit(value: &str) -> Self {
            Self {
                value: Some(value.to_string()),
                is_default: false,
            }
        }

        fn defaulted() -> Self {
            Self {
                value: Some(String::new()),
                is_default: true,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ScanErrorKind {
        /// The option requires an argument and none could be found.
        MissingArg,
        /// Option-shaped token that does not name a registered option.
        NotOption,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ScanError {
        pub token: String,
        pub kind: ScanErrorKind,
    }

    impl ScanError {
        fn missing_arg(token: impl Into<String>) -> Self {
            Self {
                token: token.into(),
                kind: ScanErrorKind::MissingArg,
            }
        }

        fn not_option(token: impl Into<String>) -> Self {
            Self {
                token: token.into(),
                kind: ScanErrorKind::NotOption,
            }
        }
    }

    impl fmt::Display for ScanError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.kind {
                ScanErrorKind::MissingArg if self.token.starts_with("--") => {
                    write!(f, "option '{}' requires an argument", self.token)
                }
                ScanErrorKind::MissingArg => {
                    let option = self.token.strip_prefix('-').unwrap_or(&self.token);
                    write!(f, "option requires an argument -- {option}")
                }
                ScanErrorKind::NotOption => write!(f, "unrecognized option '{}'", self.token),
            }
        }
    }

    impl std::error::Error for ScanError {}

    /// Everything a scan produced.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ScanOutcome {
        /// Keyed by [`OptionSpec::key`]; the last occurrence of a key wins.
        pub options: IndexMap<String, ParsedOption>,
        pub positionals: Vec<String>,
        pub errors: Vec<ScanError>,
    }

    impl ScanOutcome {
        pub fn is_clean(&self) -> bool {
            self.errors.is_empty()
        }

        pub fn get(&self, key: &str) -> Option<&ParsedOption> {
            self.options.get(key)
        }

        /// The option's argument, if it carried one.
        pub fn value(&self, key: &str) -> Option<&str> {
            self.options.get(key).and_then(|o| o.value.as_deref())
        }

        pub fn is_present(&self, key: &str) -> bool {
            self.options.contains_key(key)
        }

        fn record(&mut self, spec: &OptionSpec, parsed: ParsedOption) {
            self.options.insert(spec.key.clone(), parsed);
        }
    }

    /// How a multi-character short cluster such as `-abc` is read.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub enum ClusterMode {
        /// Only the first character of the cluster is processed; the rest is
        /// dropped without an error. Compatible with the historical tool.
        #[default]
        FirstOnly,
        /// Every character is an option, as with POSIX `getopt`.
        Full,
    }

    /// Whether options may follow positional arguments.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub enum ArgOrder {
        /// Options and positionals may be interleaved.
        #[default]
        Permute,
        /// The first positional ends option scanning, like a POSIX `getopt`
        /// spec starting with `+`. Routers use this so the options after a
        /// subcommand name reach the subcommand untouched.
        RequireOrder,
    }

    /// A token is option-shaped if it starts with `-` and is not `-` itself.
    pub fn is_option_shaped(arg: &str) -> bool {
        arg != "-" && arg.starts_with('-')
    }

    /// Scans argument vectors against an [`OptionTable`].
    #[derive(Debug, Clone, Copy)]
    pub struct Scanner<'t> {
        table: &'t OptionTable,
        cluster_mode: ClusterMode,
        order: ArgOrder,
    }

    impl<'t> Scanner<'t> {
        pub fn new(table: &'t OptionTable) -> Self {
            Self {
                table,
                cluster_mode: ClusterMode::default(),
                order: ArgOrder::default(),
            }
        }

        pub fn cluster_mode(mut self, mode: ClusterMode) -> Self {
            self.cluster_mode = mode;
            self
        }

        pub fn order(mut self, order: ArgOrder) -> Self {
            self.order = order;
            self
        }

        /// Scan `argv[start..]`.
        ///
        /// Errors never stop the scan, so one pass reports every malformed
        /// option. Everything after a literal `--` is positional.
        pub fn scan<S: AsRef<str>>(&self, argv: &[S], start: usize) -> ScanOutcome {
            let mut out = ScanOutcome::default();
            let mut options_done = false;
            let mut i = start;

            while i < argv.len() {
                let arg: &str = argv[i].as_ref();

                if options_done || !is_option_shaped(arg) {
                    if self.order == ArgOrder::RequireOrder {
                        options_done = true;
                    }
                    out.positionals.push(arg.to_string());
                    i += 1;
                    continue;
                }
                if arg == "--" {
                    options_done = true;
                    i += 1;
                    continue;
                }

                let next: Option<&str> = argv.get(i + 1).map(|s| s.as_ref());
                let consumed_next = match arg.strip_prefix("--") {
                    Some(name) => self.long_option(arg, name, next, &mut out),
                    None => self.short_option(arg, &arg[1..], next, &mut out),
                };
                i += if consumed_next { 2 } else { 1 };
            }

            out
        }

        /// Returns whether `next` was consumed as the option's argument.
        fn long_option(
            &self,
            token: &str,
            name: &str,
            next: Option<&str>,
            out: &mut ScanOutcome,
        ) -> bool {
            let Some(spec) = self.table.long(name) else {
                out.errors.push(ScanError::not_option(token));
                return false;
            };
            if !spec.has_arg {
                out.record(spec, ParsedOption::flag());
                return false;
            }
            match next.filter(|n| !is_option_shaped(n)) {
                Some(value) => {
                    out.record(spec, ParsedOption::explicit(value));
                    true
                }
                None => {
                    out.errors.push(ScanError::missing_arg(token));
                    false
                }
            }
        }

        fn short_option(
            &self,
            token: &str,
            cluster: &str,
            next: Option<&str>,
            out: &mut ScanOutcome,
        ) -> bool {
            let mut chars = cluster.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                return self.short_cluster(cluster, next, out);
            };

            let Some(spec) = self.table.short(c) else {
                out.errors.push(ScanError::not_option(token));
                return false;
            };
            if !spec.has_arg {
                out.record(spec, ParsedOption::flag());
                return false;
            }
            self.take_argument(spec, token, next, out)
        }

        fn short_cluster(&self, cluster: &str, next: Option<&str>, out: &mut ScanOutcome) -> bool {
            let first_only = self.cluster_mode == ClusterMode::FirstOnly;

            for (idx, c) in cluster.char_indices() {
                let rest = &cluster[idx + c.len_utf8()..];
                match self.table.short(c) {
                    None => out.errors.push(ScanError::not_option(c.to_string())),
                    Some(spec) if !spec.has_arg => out.record(spec, ParsedOption::flag()),
                    Some(spec) if !rest.is_empty() => {
                        out.record(spec, ParsedOption::explicit(rest));
                        return false;
                    }
                    Some(spec) => return self.take_argument(spec, &c.to_string(), next, out),
                }
                if first_only {
                    return false;
                }
            }
            false
        }

        /// Look ahead for a detached argument, falling back to the optional
        /// default.
        fn take_argument(
            &self,
            spec: &OptionSpec,
            token: &str,
            next: Option<&str>,
            out: &mut ScanOutcome,
        ) -> bool {
            match next.filter(|n| !is_option_shaped(n)) {
                Some(value) => {
                    out.record(spec, ParsedOption::explicit(value));
                    true
                }
                None if spec.arg_is_optional => {
                    out.record(spec, ParsedOption::defaulted());
                    false
                }
                None => {
                    out.errors.push(ScanError::missing_arg(token));
                    false
                }
            }
        }
    }
}

pub use scan::{
    ArgOrder, ClusterMode, ParsedOption, ScanError, ScanErrorKind, ScanOutcome, Scanner,
    is_option_shaped,
};
pub use table::{LongOption, OptionSpec, OptionTable};

/// Scan `argv[start..]` against `table` with the default cluster handling.
pub fn scan<S: AsRef<str>>(table: &OptionTable, argv: &[S], start: usize) -> ScanOutcome {
    Scanner::new(table).scan(argv, start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag() -> ParsedOption {
        ParsedOption {
            value: None,
            is_default: true,
        }
    }

    fn explicit(v: &str) -> ParsedOption {
        ParsedOption {
            value: Some(v.to_string()),
            is_default: false,
        }
    }

    fn err(token: &str, kind: ScanErrorKind) -> ScanError {
        ScanError {
            token: token.to_string(),
            kind,
        }
    }

    #[test]
    fn short_spec_parses_colons() {
        let table = OptionTable::from_short("ab:c::");
        let a = table.short('a').unwrap();
        assert!(!a.has_arg && !a.arg_is_optional);
        let b = table.short('b').unwrap();
        assert!(b.has_arg && !b.arg_is_optional);
        let c = table.short('c').unwrap();
        assert!(c.has_arg && c.arg_is_optional);
        assert_eq!(c.key, "c");
        assert!(table.short(':').is_none());
    }

    #[test]
    fn degenerate_short_spec_does_not_panic() {
        let table = OptionTable::from_short("::a");
        assert!(table.short(':').is_none());
        assert!(table.short('a').is_some());
        assert_eq!(table.short_options().count(), 1);
        assert_eq!(OptionTable::from_short("").short_options().count(), 0);
    }

    #[test]
    fn duplicate_long_names_overwrite() {
        let first = LongOption::new("out", "o");
        let second = LongOption::new("out", "x").with_arg();
        let table = OptionTable::new("", &[first, second]);
        let out = table.long("out").unwrap();
        assert_eq!(out.key, "x");
        assert!(out.has_arg);
        assert_eq!(table.long_options().count(), 1);
    }

    #[test]
    fn short_and_long_flag_share_a_key() {
        let table = OptionTable::new("v", &[LongOption::new("verbose", "v")]);
        let outcome = scan(&table, &["-v", "--verbose", "x"], 0);

        assert!(outcome.is_clean(), "{:?}", outcome.errors);
        assert_eq!(outcome.options.len(), 1);
        assert_eq!(outcome.get("v"), Some(&flag()));
        assert_eq!(outcome.positionals, ["x"]);

        let outcome = scan(&table, &["x", "--", "--verbose"], 0);
        assert!(outcome.options.is_empty());
        assert_eq!(outcome.positionals, ["x", "--verbose"]);
    }

    #[test]
    fn mixed_short_long_and_terminator() {
        let table = OptionTable::new("ab", &[LongOption::new("out", "o").with_arg()]);
        let argv = ["-a", "-b", "--out", "value", "--", "-x", "y"];
        let outcome = scan(&table, &argv, 0);

        assert!(outcome.is_clean(), "{:?}", outcome.errors);
        assert_eq!(outcome.options.len(), 3);
        assert_eq!(outcome.get("a"), Some(&flag()));
        assert_eq!(outcome.get("b"), Some(&flag()));
        assert_eq!(outcome.get("o"), Some(&explicit("value")));
        assert_eq!(outcome.positionals, vec!["-x", "y"]);
    }

    #[test]
    fn missing_required_argument_is_reported() {
        let table = OptionTable::from_short("k:");
        let outcome = scan(&table, &["-k"], 0);
        assert!(outcome.options.is_empty());
        assert_eq!(outcome.errors, vec![err("-k", ScanErrorKind::MissingArg)]);
    }

    #[test]
    fn required_argument_does_not_swallow_an_option() {
        let table = OptionTable::from_short("k:v");
        let outcome = scan(&table, &["-k", "-v"], 0);
        assert_eq!(outcome.errors, vec![err("-k", ScanErrorKind::MissingArg)]);
        assert_eq!(outcome.get("v"), Some(&flag()));
    }

    #[test]
    fn optional_argument_defaults_to_empty() {
        let table = OptionTable::from_short("z::");

        let outcome = scan(&table, &["-z"], 0);
        assert!(outcome.is_clean());
        assert_eq!(
            outcome.get("z"),
            Some(&ParsedOption {
                value: Some(String::new()),
                is_default: true,
            })
        );

        let outcome = scan(&table, &["-z", "5"], 0);
        assert_eq!(outcome.get("z"), Some(&explicit("5")));
        assert!(outcome.positionals.is_empty());
    }

    #[test]
    fn first_only_cluster_drops_the_rest() {
        let table = OptionTable::from_short("ab");
        let outcome = scan(&table, &["-ab"], 0);
        assert!(outcome.is_clean());
        assert!(outcome.positionals.is_empty());
        assert_eq!(outcome.options.len(), 1);
        assert_eq!(outcome.get("a"), Some(&flag()));
        assert!(!outcome.is_present("b"));
    }

    #[test]
    fn first_only_cluster_reports_unknown_leading_char() {
        let table = OptionTable::from_short("a");
        let outcome = scan(&table, &["-xa"], 0);
        assert_eq!(outcome.errors, vec![err("x", ScanErrorKind::NotOption)]);
        assert!(outcome.options.is_empty());
    }

    #[test]
    fn cluster_with_attached_argument() {
        let table = OptionTable::from_short("k:v");
        let outcome = scan(&table, &["-kdeadbeef", "file"], 0);
        assert_eq!(outcome.get("k"), Some(&explicit("deadbeef")));
        assert_eq!(outcome.positionals, vec!["file"]);
    }

    #[test]
    fn full_cluster_mode_reads_every_char() {
        let table = OptionTable::from_short("abk:");
        let scanner = Scanner::new(&table).cluster_mode(ClusterMode::Full);

        let outcome = scanner.scan(&["-ab"], 0);
        assert_eq!(outcome.get("a"), Some(&flag()));
        assert_eq!(outcome.get("b"), Some(&flag()));

        let outcome = scanner.scan(&["-abkvalue", "x"], 0);
        assert_eq!(outcome.get("k"), Some(&explicit("value")));
        assert_eq!(outcome.positionals, vec!["x"]);

        let outcome = scanner.scan(&["-abk", "value", "x"], 0);
        assert_eq!(outcome.get("k"), Some(&explicit("value")));
        assert_eq!(outcome.positionals, vec!["x"]);

        let outcome = scanner.scan(&["-azb"], 0);
        assert_eq!(outcome.errors, vec![err("z", ScanErrorKind::NotOption)]);
        assert!(outcome.is_present("a") && outcome.is_present("b"));

        let outcome = scanner.scan(&["-ak"], 0);
        assert_eq!(outcome.errors, vec![err("k", ScanErrorKind::MissingArg)]);
    }

    #[test]
    fn require_order_stops_at_first_positional() {
        let table = OptionTable::from_short("vd");
        let argv = ["-v", "hmac", "-k", "ab", "--", "f"];

        let scanner = Scanner::new(&table).order(ArgOrder::RequireOrder);
        let out = scanner.scan(&argv, 0);
        assert!(out.is_clean());
        assert_eq!(out.get("v"), Some(&flag()));
        assert_eq!(out.positionals, ["hmac", "-k", "ab", "--", "f"]);

        let out = Scanner::new(&table).scan(&argv, 0);
        assert_eq!(out.errors, vec![err("-k", ScanErrorKind::NotOption)]);
        assert_eq!(out.positionals, ["hmac", "ab", "f"]);
    }

    #[test]
    fn require_order_treats_dash_as_first_positional() {
        let table = OptionTable::from_short("v");
        let scanner = Scanner::new(&table).order(ArgOrder::RequireOrder);
        let out = scanner.scan(&["-", "-v"], 0);
        assert!(out.options.is_empty());
        assert_eq!(out.positionals, ["-", "-v"]);
    }

    #[test]
    fn unknown_options_are_not_options() {
        let table = OptionTable::from_short("a");
        let outcome = scan(&table, &["--bogus", "-q", "file"], 0);
        assert_eq!(
            outcome.errors,
            vec![
                err("--bogus", ScanErrorKind::NotOption),
                err("-q", ScanErrorKind::NotOption),
            ]
        );
        assert_eq!(outcome.positionals, vec!["file"]);
    }

    #[test]
    fn long_option_missing_argument() {
        let table = OptionTable::new("", &[LongOption::new("out", "o").with_optional_arg()]);
        let outcome = scan(&table, &["--out", "--", "x"], 0);
        let missing = err("--out", ScanErrorKind::MissingArg);
        assert_eq!(outcome.errors, vec![missing]);
        assert_eq!(outcome.positionals, vec!["x"]);
    }

    #[test]
    fn dash_is_positional_and_valid_argument() {
        let table = OptionTable::from_short("i:");
        let outcome = scan(&table, &["-", "-i", "-"], 0);
        assert!(outcome.is_clean());
        assert_eq!(outcome.positionals, vec!["-"]);
        assert_eq!(outcome.value("i"), Some("-"));
    }

    #[test]
    fn repeated_options_keep_last_value() {
        let table = OptionTable::new("a:", &[LongOption::new("alg", "a").with_arg()]);
        let argv = ["-a", "sha1", "--alg", "sha2-256", "-a", "sha2-512"];
        let outcome = scan(&table, &argv, 0);
        assert!(outcome.is_clean());
        assert_eq!(outcome.options.len(), 1);
        assert_eq!(outcome.value("a"), Some("sha2-512"));
    }

    #[test]
    fn start_index_skips_program_name() {
        let table = OptionTable::from_short("v");
        let outcome = scan(&table, &["-v", "-v", "rest"], 1);
        assert_eq!(outcome.get("v"), Some(&flag()));
        assert_eq!(outcome.positionals, vec!["rest"]);

        let outcome = scan(&table, &["prog"], 5);
        assert_eq!(outcome, ScanOutcome::default());
    }

    #[test]
    fn scanning_is_repeatable() {
        let table = OptionTable::new("ab:z::", &[LongOption::new("out", "o").with_arg()]);
        let argv = ["-ab", "x", "--bogus", "-z", "--out", "f", "-", "--", "-a"];
        assert_eq!(scan(&table, &argv, 0), scan(&table, &argv, 0));
    }

    #[test]
    fn errors_render_like_getopt() {
        assert_eq!(
            err("k", ScanErrorKind::MissingArg).to_string(),
            "option requires an argument -- k"
        );
        assert_eq!(
            err("--bogus", ScanErrorKind::NotOption).to_string(),
            "unrecognized option '--bogus'"
        );
    }

    #[test]
    fn missing_argument_renders_the_bare_option() {
        let table = OptionTable::new("k:", &[LongOption::new("out", "o").with_arg()]);
        let outcome = scan(&table, &["-k"], 0);
        assert_eq!(outcome.errors[0].token, "-k");
        let rendered = outcome.errors[0].to_string();
        assert_eq!(rendered, "option requires an argument -- k");

        let outcome = scan(&table, &["--out"], 0);
        let rendered = outcome.errors[0].to_string();
        assert_eq!(rendered, "option '--out' requires an argument");
    }
}
