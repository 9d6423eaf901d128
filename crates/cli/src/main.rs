use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use assfonts_ass::AssParser;
use assfonts_font::{FontDatabase, FontError, SubsetOptions};
use assfonts_srt::{SrtParser, DEFAULT_ASS_HEADER};

#[derive(Parser)]
#[command(name = "assfonts")]
#[command(about = "Embed subset fonts into ASS subtitle scripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
struct DatabaseArgs {
    /// Extra font directories, comma separated
    #[arg(long, value_delimiter = ',')]
    fontdir: Vec<PathBuf>,
    /// Do not scan the operating system's font directories
    #[arg(long)]
    no_system_fonts: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Subset the fonts a script uses and embed them into it
    Embed {
        /// Input ASS script
        #[arg(short, long)]
        input: PathBuf,
        /// Output ASS script
        #[arg(short, long)]
        output: PathBuf,
        /// Font database file; built from the font directories when absent
        #[arg(long)]
        db: Option<PathBuf>,
        #[command(flatten)]
        database: DatabaseArgs,
        /// Subset fonts in parallel
        #[arg(long)]
        parallel: bool,
        /// Report codepoints the matched faces cannot render
        #[arg(long)]
        check_glyphs: bool,
        /// Cache font files in memory during subsetting
        #[arg(long)]
        big_memory: bool,
    },
    /// Scan font directories and save the face database
    BuildDb {
        /// Database file to write
        #[arg(long)]
        db: PathBuf,
        #[command(flatten)]
        database: DatabaseArgs,
    },
    /// Convert an SRT subtitle to a plain ASS script
    Srt2ass {
        /// Input SRT file
        #[arg(short, long)]
        input: PathBuf,
        /// Output ASS script
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Embed {
            input,
            output,
            db,
            database,
            parallel,
            check_glyphs,
            big_memory,
        } => embed(EmbedArgs { input, output, db, database, parallel, check_glyphs, big_memory }),
        Commands::BuildDb { db, database } => build_db(db, database),
        Commands::Srt2ass { input, output } => srt2ass(input, output),
    }
}

struct EmbedArgs {
    input: PathBuf,
    output: PathBuf,
    db: Option<PathBuf>,
    database: DatabaseArgs,
    parallel: bool,
    check_glyphs: bool,
    big_memory: bool,
}

fn embed(args: EmbedArgs) -> Result<()> {
    let file = File::open(&args.input)
        .with_context(|| format!("failed to open input script {}", args.input.display()))?;
    let mut parser = AssParser::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to read input script {}", args.input.display()))?;
    parser
        .parse()
        .with_context(|| format!("failed to parse {}", args.input.display()))?;
    info!("{} distinct font keys in use", parser.font_sets().len());

    let mut db = FontDatabase::new().big_memory_mode(args.big_memory);
    match &args.db {
        Some(path) if path.is_file() => {
            db.load(path)
                .with_context(|| format!("failed to load font database {}", path.display()))?;
            info!("loaded {} faces from {}", db.face_count(), path.display());
        }
        _ => {
            db.build(&args.database.fontdir, !args.database.no_system_fonts)
                .context("failed to build font database")?;
            info!("indexed {} faces", db.face_count());
            if let Some(path) = &args.db {
                db.save(path)
                    .with_context(|| format!("failed to save font database {}", path.display()))?;
            }
        }
    }

    let keep_going = |err: &FontError| {
        error!("{err}");
        true
    };
    let options = SubsetOptions::new()
        .parallel(args.parallel)
        .check_coverage(args.check_glyphs)
        .on_error(&keep_going);
    let fonts = db
        .subset(parser.font_sets(), &options)
        .context("failed to subset fonts")?;

    let out = File::create(&args.output)
        .with_context(|| format!("failed to create output script {}", args.output.display()))?;
    let mut writer = BufWriter::new(out);
    parser
        .write_embedded(&fonts, &mut writer)
        .and_then(|_| writer.flush())
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("embedded {} fonts into {}", fonts.len(), args.output.display());
    Ok(())
}

fn build_db(db_path: PathBuf, database: DatabaseArgs) -> Result<()> {
    let mut db = FontDatabase::new();
    db.build(&database.fontdir, !database.no_system_fonts)
        .context("failed to build font database")?;
    if db.is_empty() {
        warn!("no faces indexed");
    }
    db.save(&db_path)
        .with_context(|| format!("failed to save font database {}", db_path.display()))?;
    info!("saved {} faces to {}", db.face_count(), db_path.display());
    Ok(())
}

fn srt2ass(input: PathBuf, output: PathBuf) -> Result<()> {
    let file = File::open(&input)
        .with_context(|| format!("failed to open input subtitle {}", input.display()))?;
    let parser = SrtParser::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", input.display()))?;
    let out = File::create(&output)
        .with_context(|| format!("failed to create output script {}", output.display()))?;
    let mut writer = BufWriter::new(out);
    parser
        .to_ass(&mut writer, DEFAULT_ASS_HEADER)
        .with_context(|| format!("failed to write {}", output.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("converted {} cues to {}", parser.cues().len(), output.display());
    Ok(())
}
