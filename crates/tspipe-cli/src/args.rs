use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use tspipe::{Config, SearchLocation, SourceFile};

/// CLI arguments for the tspipe binary.
#[derive(Parser, Debug)]
#[command(
    name = "tspipe",
    version,
    about = "Compile TypeScript with tsc and republish its output"
)]
pub struct CliArgs {
    /// Source files to compile.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// JSON (with comments) options file; flags given here override it.
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Base directory the source tree is rooted at (defaults to the current directory).
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// Where artifacts are written (defaults to outDir, else the current directory).
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Do not write artifacts, only report them.
    #[arg(long = "dryRun", alias = "dry-run")]
    pub dry_run: bool,

    // ==================== Compiler Options ====================
    /// Module code generation (e.g. commonjs, amd).
    #[arg(short = 'm', long)]
    pub module: Option<String>,

    /// ECMAScript target version.
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Concatenate output into a single file.
    #[arg(long)]
    pub out: Option<String>,

    /// Output directory for emitted files.
    #[arg(long = "outDir", alias = "out-dir")]
    pub out_dir: Option<PathBuf>,

    #[arg(long = "mapRoot", alias = "map-root")]
    pub map_root: Option<String>,

    #[arg(long = "sourceRoot", alias = "source-root")]
    pub source_root: Option<String>,

    #[arg(long)]
    pub allowbool: bool,

    #[arg(long)]
    pub allowimportmodule: bool,

    #[arg(
        long = "suppressImplicitAnyIndexErrors",
        alias = "suppress-implicit-any-index-errors"
    )]
    pub suppress_implicit_any_index_errors: bool,

    /// Emit .d.ts files.
    #[arg(short = 'd', long)]
    pub declaration: bool,

    #[arg(long = "noImplicitAny", alias = "no-implicit-any")]
    pub no_implicit_any: bool,

    #[arg(long = "noResolve", alias = "no-resolve")]
    pub no_resolve: bool,

    #[arg(long = "removeComments", alias = "remove-comments")]
    pub remove_comments: bool,

    /// Emit source maps.
    #[arg(long = "sourcemap", alias = "source-map")]
    pub sourcemap: bool,

    #[arg(long = "noLib", alias = "no-lib")]
    pub no_lib: bool,

    #[arg(long = "emitDecoratorMetadata", alias = "emit-decorator-metadata")]
    pub emit_decorator_metadata: bool,

    /// Extra arguments passed to tsc verbatim (repeatable).
    #[arg(long = "tscArg", alias = "tsc-arg", allow_hyphen_values = true)]
    pub tsc_args: Vec<String>,

    // ==================== Pipeline Options ====================
    /// Skip output entirely when the compiler fails.
    #[arg(long)]
    pub safe: bool,

    /// Parent directory for temporary files.
    #[arg(long = "tmpDir", alias = "tmp-dir")]
    pub tmp_dir: Option<PathBuf>,

    /// Do not preserve the source tree layout in the output.
    #[arg(long = "flatten")]
    pub flatten: bool,

    /// Compiler executable to run.
    #[arg(long = "tscPath", alias = "tsc-path")]
    pub tsc_path: Option<PathBuf>,

    /// Where to look for tsc, in order.
    #[arg(long = "tscSearch", alias = "tsc-search", value_enum, value_delimiter = ',')]
    pub tsc_search: Option<Vec<Search>>,

    /// Disable colored output.
    #[arg(long = "noColor", alias = "no-color")]
    pub no_color: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Search {
    Cwd,
    Shell,
}

impl From<Search> for SearchLocation {
    fn from(value: Search) -> Self {
        match value {
            Search::Cwd => SearchLocation::Cwd,
            Search::Shell => SearchLocation::Shell,
        }
    }
}

impl CliArgs {
    /// Layer the command-line options over `base`.
    pub fn apply_to(&self, mut config: Config) -> Config {
        fn replace<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        replace(&mut config.module, &self.module);
        replace(&mut config.target, &self.target);
        replace(&mut config.out, &self.out);
        replace(&mut config.out_dir, &self.out_dir);
        replace(&mut config.map_root, &self.map_root);
        replace(&mut config.source_root, &self.source_root);
        replace(&mut config.tmp_dir, &self.tmp_dir);
        replace(&mut config.tsc_path, &self.tsc_path);

        config.allowbool |= self.allowbool;
        config.allowimportmodule |= self.allowimportmodule;
        config.suppress_implicit_any_index_errors |= self.suppress_implicit_any_index_errors;
        config.declaration |= self.declaration;
        config.no_implicit_any |= self.no_implicit_any;
        config.no_resolve |= self.no_resolve;
        config.remove_comments |= self.remove_comments;
        config.sourcemap |= self.sourcemap;
        config.no_lib |= self.no_lib;
        config.emit_decorator_metadata |= self.emit_decorator_metadata;
        config.safe |= self.safe;
        if self.flatten {
            config.keep_tree = false;
        }

        config
            .additional_tsc_parameters
            .extend(self.tsc_args.iter().cloned());
        if let Some(search) = self.tsc_search.as_ref() {
            config.tsc_search = search.iter().copied().map(SearchLocation::from).collect();
        }
        config
    }

    /// The source files, each rooted at `--base` (or `cwd`).
    pub fn sources(&self, cwd: &Path) -> Vec<SourceFile> {
        let base = match self.base.as_ref() {
            Some(base) => cwd.join(base),
            None => cwd.to_path_buf(),
        };
        self.files
            .iter()
            .map(|file| SourceFile::new(cwd.join(file), &base))
            .collect()
    }

    /// Directory artifacts are written to.
    pub fn destination(&self, config: &Config, cwd: &Path) -> PathBuf {
        match self.dest.as_ref() {
            Some(dest) => cwd.join(dest),
            None => config
                .resolved_out_dir(cwd)
                .unwrap_or_else(|| cwd.to_path_buf()),
        }
    }
}
