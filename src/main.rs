use clap::{Parser, Subcommand};
use drcblob::blob::ResourceBlob;
use drcblob::session::{self, parse_offset, ReplaceOptions};
use drcblob::sound::AudioBuffer;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drcblob", about = "Inspect and edit DRC resource blobs", version)]
struct Cli {
    /// Log decode/encode details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List resources
    List {
        input: PathBuf,
        /// Byte offset of the blob inside INPUT (decimal or 0x-hex)
        #[arg(short = 'O', long, default_value = "0", value_parser = parse_offset)]
        offset: u64,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the properties of every resource, or of one
    Info {
        input: PathBuf,
        #[arg(short = 'O', long, default_value = "0", value_parser = parse_offset)]
        offset: u64,
        #[arg(short, long)]
        index: Option<usize>,
    },
    /// Dump the raw descriptor table, including records of unknown type
    Descriptors {
        input: PathBuf,
        #[arg(short = 'O', long, default_value = "0", value_parser = parse_offset)]
        offset: u64,
    },
    /// Print the palette of a bitmap
    Palette {
        input: PathBuf,
        index: usize,
        #[arg(short = 'O', long, default_value = "0", value_parser = parse_offset)]
        offset: u64,
    },
    /// Write every bitmap as PNG and every sound as WAV
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(short = 'O', long, default_value = "0", value_parser = parse_offset)]
        offset: u64,
    },
    /// Render a preview thumbnail of one resource
    Preview {
        input: PathBuf,
        index: usize,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "150")]
        size: u32,
        #[arg(short = 'O', long, default_value = "0", value_parser = parse_offset)]
        offset: u64,
    },
    /// Replace a bitmap with an image file and save the blob
    ReplaceBitmap {
        input: PathBuf,
        index: usize,
        image: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Resize filter: nearest, triangle (default), catmullrom, gaussian, lanczos3
        #[arg(short, long, default_value = "triangle")]
        filter: String,
        #[arg(short = 'O', long, default_value = "0", value_parser = parse_offset)]
        offset: u64,
    },
    /// Replace a sound with a WAV file and save the blob
    ReplaceSound {
        input: PathBuf,
        index: usize,
        wav: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short = 'O', long, default_value = "0", value_parser = parse_offset)]
        offset: u64,
    },
    /// Decode and re-encode the blob unchanged
    Repack {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short = 'O', long, default_value = "0", value_parser = parse_offset)]
        offset: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, offset, json } => {
            let blob = session::open_blob(&input, offset)?;
            let infos = session::list(&blob);
            if json {
                println!("{}", serde_json::to_string_pretty(&infos)?);
                return Ok(());
            }
            println!("Blob: {} @ 0x{:x}", input.display(), offset);
            println!("{:>5} {:<7} {:>6} {:>10} {:>10}  Details",
                     "Index", "Type", "ID", "Offset", "Size");
            for (info, resource) in infos.iter().zip(blob.iter()) {
                let details = match (resource.as_bitmap(), resource.as_sound()) {
                    (Some(b), _) => format!("{}x{}", b.info().width, b.info().height),
                    (_, Some(s)) => format!("{} Hz, {:.2} s", s.frequency(), s.duration_secs()),
                    _            => String::new(),
                };
                println!("{:>5} {:<7} 0x{:04x} {:>10} {:>10}  {}",
                    info.index, info.resource_type.name(), info.id,
                    info.offset, info.size, details);
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, offset, index } => {
            let blob = session::open_blob(&input, offset)?;
            match index {
                Some(i) => println!("{}", blob.get(i)?.properties()),
                None => {
                    for (i, r) in blob.iter().enumerate() {
                        println!("#{i}");
                        println!("{}", r.properties());
                    }
                }
            }
        }

        // ── Descriptors ──────────────────────────────────────────────────────
        Commands::Descriptors { input, offset } => {
            let mut file = std::io::BufReader::new(std::fs::File::open(&input)?);
            let table = ResourceBlob::read_descriptor_table(&mut file, offset)?;
            println!("{} descriptor(s), payload region at 0x{:x}",
                     table.len(), offset + ResourceBlob::payload_base(table.len()));
            for (i, d) in table.iter().enumerate() {
                println!("  [{:3}] type={:<12} id=0x{:04x} offset={:<10} size={:<10} info={}",
                    i, d.kind().to_string(), d.id, d.offset, d.size, hex::encode(d.type_info));
            }
        }

        // ── Palette ──────────────────────────────────────────────────────────
        Commands::Palette { input, index, offset } => {
            let blob = session::open_blob(&input, offset)?;
            let bmp = blob.get(index)?
                .as_bitmap()
                .ok_or_else(|| format!("resource #{index} is not a bitmap"))?;
            print!("{}", bmp.palette_listing());
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir, offset } => {
            let blob = session::open_blob(&input, offset)?;
            for path in session::extract_all(&blob, &output_dir)? {
                println!("  wrote  {}", path.display());
            }
        }

        // ── Preview ──────────────────────────────────────────────────────────
        Commands::Preview { input, index, output, size, offset } => {
            let blob = session::open_blob(&input, offset)?;
            blob.get(index)?.preview(size, size).save(&output)?;
            println!("Preview: {}", output.display());
        }

        // ── ReplaceBitmap ────────────────────────────────────────────────────
        Commands::ReplaceBitmap { input, index, image, output, filter, offset } => {
            let opts = ReplaceOptions { filter: parse_filter(&filter) };
            let mut blob = session::open_blob(&input, offset)?;
            let img = image::open(&image)?;
            session::replace_bitmap(&mut blob, index, &img, &opts)?;
            session::save_blob(&mut blob, &output)?;
            println!("Replaced bitmap #{index} → {}", output.display());
        }

        // ── ReplaceSound ─────────────────────────────────────────────────────
        Commands::ReplaceSound { input, index, wav, output, offset } => {
            let mut blob = session::open_blob(&input, offset)?;
            let audio = AudioBuffer::from_wav_file(&wav)?;
            session::replace_sound(&mut blob, index, &audio)?;
            session::save_blob(&mut blob, &output)?;
            println!("Replaced sound #{index} → {}", output.display());
        }

        // ── Repack ───────────────────────────────────────────────────────────
        Commands::Repack { input, output, offset } => {
            let mut blob = session::open_blob(&input, offset)?;
            session::save_blob(&mut blob, &output)?;
            println!("Repacked → {}", output.display());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn parse_filter(s: &str) -> image::imageops::FilterType {
    session::filter_from_name(s).unwrap_or_else(|| {
        eprintln!("Unknown filter '{}', defaulting to triangle", s);
        image::imageops::FilterType::Triangle
    })
}
