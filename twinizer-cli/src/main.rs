//! Twinizer CLI - convert KiCad schematics and PCBs into BOMs, Mermaid
//! diagrams, statistics and simplified 3D models.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;

use twinizer::batch::{run_batch, BatchOptions, Projection};
use twinizer::convert::bom::{Bom, BomOptions, BomSort, GroupField};
use twinizer::convert::mermaid;
use twinizer::convert::model3d::BoardModel;
use twinizer::parser::{parse_file, Design, ParseOutcome};
use twinizer::{FileTypeFilter, ParseOptions, ParseReport, TwinizerError};

#[derive(Parser)]
#[command(name = "twinizer")]
#[command(about = "KiCad schematic and PCB conversion tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a design file and print its model summary and parse report
    Parse {
        /// Path to .sch, .kicad_sch or .kicad_pcb file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Treat duplicate reference designators as errors
        #[arg(long)]
        strict: bool,
    },

    /// Generate a bill of materials from a schematic
    Bom {
        /// Path to schematic file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: BomFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Grouping key for BOM rows
        #[arg(long, value_enum, default_value = "value-footprint")]
        group_by: GroupByArg,

        /// Drop references matching this regular expression (e.g. '^TP')
        #[arg(long)]
        exclude: Option<String>,

        /// Extra component fields to include as columns
        #[arg(long = "field")]
        fields: Vec<String>,

        /// Row sort key
        #[arg(long, value_enum, default_value = "group-key")]
        sort: SortArg,

        /// Resolve and include hierarchical child sheets
        #[arg(long)]
        hierarchy: bool,
    },

    /// Generate a Mermaid diagram from a design
    Diagram {
        /// Path to design file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Diagram kind
        #[arg(short, long, value_enum, default_value = "flowchart")]
        kind: DiagramKind,

        /// Flow direction for flowcharts
        #[arg(short, long, value_enum, default_value = "td")]
        direction: DirectionArg,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extrude a board into a simplified OBJ model
    Model3d {
        /// Path to .kicad_pcb file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print board statistics
    Stats {
        /// Path to .kicad_pcb file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Convert every design file under a directory
    Batch {
        /// Input directory
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        /// Output directory for generated artifacts
        #[arg(short, long, default_value = "twinizer-out")]
        output: PathBuf,

        /// Projection applied to every file
        #[arg(short, long, value_enum, default_value = "bom-csv")]
        projection: ProjectionArg,

        /// Restrict to schematics or boards
        #[arg(long, value_enum, default_value = "both")]
        filter: FilterArg,

        /// Recurse into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Worker count (defaults to available parallelism)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Stop submitting files past this budget
        #[arg(long)]
        max_files: Option<usize>,

        /// Exit with an error code if any file failed
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for tooling
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum BomFormat {
    Csv,
    Json,
    Markdown,
    Text,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupByArg {
    /// Group by component value only
    Value,
    /// Group by footprint only
    Footprint,
    /// Group by value and footprint
    ValueFootprint,
    /// Group by library id
    LibId,
}

impl From<GroupByArg> for Vec<GroupField> {
    fn from(arg: GroupByArg) -> Self {
        match arg {
            GroupByArg::Value => vec![GroupField::Value],
            GroupByArg::Footprint => vec![GroupField::Footprint],
            GroupByArg::ValueFootprint => vec![GroupField::Value, GroupField::Footprint],
            GroupByArg::LibId => vec![GroupField::LibId],
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    /// Lexicographic on the grouping key
    GroupKey,
    /// Largest groups first
    Quantity,
    /// First member reference
    Reference,
}

impl From<SortArg> for BomSort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::GroupKey => BomSort::GroupKey,
            SortArg::Quantity => BomSort::Quantity,
            SortArg::Reference => BomSort::Reference,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DiagramKind {
    Flowchart,
    Class,
    Er,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Td,
    Bt,
    Lr,
    Rl,
}

impl From<DirectionArg> for mermaid::Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Td => mermaid::Direction::TopDown,
            DirectionArg::Bt => mermaid::Direction::BottomUp,
            DirectionArg::Lr => mermaid::Direction::LeftRight,
            DirectionArg::Rl => mermaid::Direction::RightLeft,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ProjectionArg {
    BomCsv,
    BomJson,
    Flowchart,
    ClassDiagram,
    ErDiagram,
    Model3d,
    Json,
}

impl From<ProjectionArg> for Projection {
    fn from(arg: ProjectionArg) -> Self {
        match arg {
            ProjectionArg::BomCsv => Projection::BomCsv,
            ProjectionArg::BomJson => Projection::BomJson,
            ProjectionArg::Flowchart => Projection::Flowchart,
            ProjectionArg::ClassDiagram => Projection::ClassDiagram,
            ProjectionArg::ErDiagram => Projection::ErDiagram,
            ProjectionArg::Model3d => Projection::Model3d,
            ProjectionArg::Json => Projection::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    Schematic,
    Pcb,
    Both,
}

impl From<FilterArg> for FileTypeFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Schematic => FileTypeFilter::Schematic,
            FilterArg::Pcb => FileTypeFilter::Pcb,
            FilterArg::Both => FileTypeFilter::Both,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Parse {
            file,
            format,
            strict,
        } => handle_parse(&file, format, strict),
        Commands::Bom {
            file,
            format,
            output,
            group_by,
            exclude,
            fields,
            sort,
            hierarchy,
        } => handle_bom(
            &file, format, output, group_by, exclude, fields, sort, hierarchy,
        ),
        Commands::Diagram {
            file,
            kind,
            direction,
            output,
        } => handle_diagram(&file, kind, direction, output),
        Commands::Model3d { file, output } => handle_model3d(&file, output),
        Commands::Stats { file, format } => handle_stats(&file, format),
        Commands::Batch {
            dir,
            output,
            projection,
            filter,
            recursive,
            jobs,
            max_files,
            strict,
        } => handle_batch(
            &dir, output, projection, filter, recursive, jobs, max_files, strict,
        ),
    };

    process::exit(exit_code);
}

fn print_report(report: &ParseReport) {
    for diagnostic in &report.diagnostics {
        eprintln!("{}", diagnostic);
    }
}

fn write_artifact(output: Option<PathBuf>, artifact: &str) -> i32 {
    match output {
        Some(path) => match std::fs::write(&path, artifact) {
            Ok(()) => {
                println!("wrote {}", path.display());
                0
            }
            Err(e) => {
                eprintln!("Error: cannot write {}: {}", path.display(), e);
                1
            }
        },
        None => {
            println!("{}", artifact);
            0
        }
    }
}

fn load(file: &Path, options: ParseOptions) -> Result<ParseOutcome, TwinizerError> {
    let outcome = parse_file(file, options)?;
    print_report(&outcome.report);
    Ok(outcome)
}

fn load_schematic(
    file: &Path,
    hierarchy: bool,
) -> Result<twinizer::parser::schema::Schematic, TwinizerError> {
    if hierarchy {
        let (sheets, report) =
            twinizer::parser::hierarchy::resolve_hierarchy(file, ParseOptions::default())?;
        print_report(&report);
        return Ok(twinizer::parser::hierarchy::flatten(&sheets));
    }
    let outcome = load(file, ParseOptions::default())?;
    match outcome.design {
        Design::Schematic(sch) => Ok(sch),
        Design::Pcb(_) => Err(TwinizerError::Other(format!(
            "{} is a board file; this command needs a schematic",
            file.display()
        ))),
    }
}

fn handle_parse(file: &Path, format: OutputFormat, strict: bool) -> i32 {
    let options = ParseOptions {
        strict_references: strict,
    };
    match load(file, options) {
        Ok(outcome) => {
            match format {
                OutputFormat::Json => {
                    let json = match &outcome.design {
                        Design::Schematic(sch) => serde_json::to_string_pretty(sch),
                        Design::Pcb(pcb) => serde_json::to_string_pretty(pcb),
                    };
                    match json {
                        Ok(json) => println!("{}", json),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            return 1;
                        }
                    }
                }
                OutputFormat::Human => match &outcome.design {
                    Design::Schematic(sch) => {
                        println!("File: {}", sch.filename);
                        println!("  components: {}", sch.components.len());
                        println!("  nets:       {}", sch.nets.len());
                        println!("  labels:     {}", sch.labels.len());
                        println!("  sheets:     {}", sch.sheets.len());
                    }
                    Design::Pcb(pcb) => {
                        println!("File: {}", pcb.filename);
                        println!("  modules: {}", pcb.modules.len());
                        println!("  tracks:  {}", pcb.tracks.len());
                        println!("  vias:    {}", pcb.vias.len());
                        println!("  zones:   {}", pcb.zones.len());
                    }
                },
            }
            if outcome.report.has_errors() {
                1
            } else {
                0
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_bom(
    file: &Path,
    format: BomFormat,
    output: Option<PathBuf>,
    group_by: GroupByArg,
    exclude: Option<String>,
    fields: Vec<String>,
    sort: SortArg,
    hierarchy: bool,
) -> i32 {
    let exclude_references = match exclude {
        Some(pattern) => match regex::Regex::new(&pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                eprintln!("Error: invalid --exclude pattern: {}", e);
                return 1;
            }
        },
        None => None,
    };

    let schematic = match load_schematic(file, hierarchy) {
        Ok(sch) => sch,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let options = BomOptions {
        group_by: group_by.into(),
        exclude_references,
        include_fields: fields,
        sort: sort.into(),
    };
    let bom = Bom::from_schematic(&schematic, &options);
    let artifact = match format {
        BomFormat::Csv => bom.to_csv(),
        BomFormat::Json => bom.to_json(),
        BomFormat::Markdown => Ok(bom.to_markdown()),
        BomFormat::Text => Ok(bom.to_text()),
    };
    match artifact {
        Ok(artifact) => write_artifact(output, &artifact),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn handle_diagram(
    file: &Path,
    kind: DiagramKind,
    direction: DirectionArg,
    output: Option<PathBuf>,
) -> i32 {
    let outcome = match load(file, ParseOptions::default()) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let artifact = match (&outcome.design, kind) {
        (Design::Schematic(sch), DiagramKind::Flowchart) => {
            Ok(mermaid::flowchart(sch, direction.into()))
        }
        (Design::Schematic(sch), DiagramKind::Class) => Ok(mermaid::class_diagram(sch)),
        (Design::Schematic(sch), DiagramKind::Er) => Ok(mermaid::er_diagram(sch)),
        (Design::Pcb(pcb), DiagramKind::Flowchart) => {
            Ok(mermaid::pcb_flowchart(pcb, direction.into()))
        }
        (Design::Pcb(_), _) => Err("only flowchart diagrams are available for board files"),
    };
    match artifact {
        Ok(artifact) => write_artifact(output, &artifact),
        Err(message) => {
            eprintln!("Error: {}", message);
            1
        }
    }
}

fn handle_model3d(file: &Path, output: Option<PathBuf>) -> i32 {
    let outcome = match load(file, ParseOptions::default()) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let Design::Pcb(pcb) = &outcome.design else {
        eprintln!("Error: {} is not a board file", file.display());
        return 1;
    };
    match BoardModel::from_pcb(pcb) {
        Ok(model) => write_artifact(output, &model.to_obj()),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn handle_stats(file: &Path, format: OutputFormat) -> i32 {
    let outcome = match load(file, ParseOptions::default()) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let Design::Pcb(pcb) = &outcome.design else {
        eprintln!("Error: {} is not a board file", file.display());
        return 1;
    };
    let stats = pcb.statistics();
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&stats) {
            Ok(json) => {
                println!("{}", json);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        OutputFormat::Human => {
            println!("File: {}", pcb.filename);
            println!("  modules: {}", stats.module_count);
            for (side, count) in &stats.modules_by_side {
                println!("    {}: {}", side, count);
            }
            println!("  tracks:  {}", stats.track_count);
            for (layer, count) in &stats.tracks_by_layer {
                println!("    {}: {}", layer, count);
            }
            println!("  track length: {:.2} mm", stats.total_track_length);
            println!("  vias:    {}", stats.via_count);
            println!("  zones:   {}", stats.zone_count);
            println!(
                "  board:   {:.1} x {:.1} mm",
                stats.board_dimensions.0, stats.board_dimensions.1
            );
            0
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_batch(
    dir: &Path,
    output: PathBuf,
    projection: ProjectionArg,
    filter: FilterArg,
    recursive: bool,
    jobs: Option<usize>,
    max_files: Option<usize>,
    strict: bool,
) -> i32 {
    let options = BatchOptions {
        filter: filter.into(),
        recursive,
        projection: projection.into(),
        output_dir: output,
        pool_size: jobs,
        max_files,
        parse_options: ParseOptions::default(),
    };

    match run_batch(dir, &options) {
        Ok(summary) => {
            println!(
                "processed {} files: {} succeeded, {} failed",
                summary.total(),
                summary.succeeded.len(),
                summary.failed.len()
            );
            for (path, error) in &summary.failed {
                eprintln!("  {}: {}", path.display(), error);
            }
            if strict && !summary.failed.is_empty() {
                1
            } else {
                0
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}
