use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::error;
use pdfprobe::{
    decode_body, inspect, list_contents, search_streams, smask_graph, stream_stats, walk_pages,
    ContentStatus, Document, Result, MIN_ASCII_RUN,
};

#[derive(Parser, Debug)]
#[clap(
    name = "probeutil",
    version,
    about = "Inspect, decode and search PDF objects and streams.",
    arg_required_else_help = true
)]
struct Cli {
    /// Print reports as JSON instead of text.
    #[clap(long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the dictionary text and stream previews of one or more objects.
    Inspect {
        pdf_path: PathBuf,
        /// Object numbers to inspect.
        #[clap(required = true)]
        objects: Vec<u32>,
        /// Also decode each stream and preview the result.
        #[clap(long)]
        decode: bool,
    },
    /// Decode one stream and write it to standard output.
    Dump { pdf_path: PathBuf, object: u32 },
    /// Search every stream in the document for byte needles.
    Find {
        pdf_path: PathBuf,
        #[clap(required = true)]
        needles: Vec<String>,
    },
    /// Walk page objects and search their content streams.
    Pages {
        pdf_path: PathBuf,
        #[clap(required = true)]
        needles: Vec<String>,
    },
    /// List each page's content streams and flag streams shared by pages.
    Contents { pdf_path: PathBuf },
    /// Show the /SMask reference graph.
    Smask { pdf_path: PathBuf },
    /// Stream statistics: entropy, byte diversity and printable runs.
    Stats {
        pdf_path: PathBuf,
        object: u32,
        /// Shortest printable-ASCII run worth reporting.
        #[clap(long, default_value_t = MIN_ASCII_RUN)]
        min_run: usize,
    },
}

fn logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init()
}

fn main() {
    logging();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Inspect {
            ref pdf_path,
            ref objects,
            decode,
        } => cmd_inspect(&Document::load(pdf_path)?, objects, decode, cli.json),
        Command::Dump { ref pdf_path, object } => cmd_dump(&Document::load(pdf_path)?, object),
        Command::Find {
            ref pdf_path,
            ref needles,
        } => cmd_find(&Document::load(pdf_path)?, needles, cli.json),
        Command::Pages {
            ref pdf_path,
            ref needles,
        } => cmd_pages(&Document::load(pdf_path)?, needles, cli.json),
        Command::Contents { ref pdf_path } => cmd_contents(&Document::load(pdf_path)?, cli.json),
        Command::Smask { ref pdf_path } => cmd_smask(&Document::load(pdf_path)?, cli.json),
        Command::Stats {
            ref pdf_path,
            object,
            min_run,
        } => cmd_stats(&Document::load(pdf_path)?, object, min_run, cli.json),
    }
}

fn print_json<T: serde::Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report).map_err(io::Error::from)?);
    Ok(())
}

fn cmd_inspect(doc: &Document, objects: &[u32], decode: bool, json: bool) -> Result<()> {
    let mut summaries = Vec::new();
    for &number in objects {
        match inspect(doc, number, decode) {
            Ok(summary) => summaries.push(summary),
            Err(err) => eprintln!("[!] {err}"),
        }
    }
    if json {
        return print_json(&summaries);
    }
    for summary in &summaries {
        println!("--- object {} gen {} at offset {} ---", summary.object, summary.generation, summary.offset);
        println!("{}", summary.dictionary);
        match &summary.stream {
            None => println!("no stream"),
            Some(stream) => {
                println!("stream: {} raw byte(s)", stream.raw_len);
                println!("  {}", stream.raw_preview);
                if let Some(decoded) = &stream.decoded {
                    println!("decoded ({}): {} byte(s)", decoded.kind, decoded.len);
                    println!("  {}", decoded.preview);
                }
                if let Some(err) = &stream.decode_error {
                    println!("[!] decode failed: {err}");
                }
            }
        }
        println!();
    }
    Ok(())
}

fn cmd_dump(doc: &Document, object: u32) -> Result<()> {
    let record = match doc.locate(object) {
        Ok(record) => record,
        Err(err) => {
            eprintln!("[!] {err}");
            return Ok(());
        }
    };
    let Some(raw) = doc.stream_bytes(&record) else {
        eprintln!("[!] object {object} has no stream");
        return Ok(());
    };
    let dict = match doc.dictionary(&record) {
        Ok(dict) => dict,
        Err(err) => {
            eprintln!("[!] {err}");
            return Ok(());
        }
    };
    match decode_body(&dict, raw) {
        Ok(body) => io::stdout().write_all(body.data())?,
        Err(err) => eprintln!("[!] {err}"),
    }
    Ok(())
}

fn cmd_find(doc: &Document, needles: &[String], json: bool) -> Result<()> {
    let report = search_streams(doc, needles);
    if json {
        return print_json(&report);
    }
    println!("[*] searched {} stream(s) for {} needle(s)", report.scanned, needles.len());
    for hit in &report.hits {
        println!("[!] object {} ({}):", hit.object, hit.kind);
        for m in &hit.matches {
            println!("    {:?} at offset {}: ...{}...", m.needle, m.offset, m.context);
        }
    }
    for err in &report.errors {
        println!("[!] {err}");
    }
    if report.hits.is_empty() {
        println!("[*] no matches");
    }
    Ok(())
}

fn cmd_pages(doc: &Document, needles: &[String], json: bool) -> Result<()> {
    let walk = walk_pages(doc, needles);
    if json {
        return print_json(&walk);
    }
    println!("[*] {} page object(s)", walk.pages.len());
    for page in &walk.pages {
        println!("[*] page object {} contents {:?}", page.page, page.contents);
        if let Some(err) = &page.contents_error {
            println!("    [!] /Contents: {err}");
        }
        for stream in &page.streams {
            match &stream.status {
                ContentStatus::Clean => println!("    [+] object {} clean", stream.object),
                ContentStatus::Missing => println!("    [!] object {} missing or without stream", stream.object),
                ContentStatus::Failed(err) => println!("    [!] object {}: {err}", stream.object),
                ContentStatus::Matched(matches) => {
                    for m in matches {
                        println!("    [!] object {}: {:?} at offset {}", stream.object, m.needle, m.offset);
                        println!("        ...{}...", m.context);
                    }
                }
            }
        }
    }
    for err in &walk.errors {
        println!("[!] {err}");
    }
    Ok(())
}

fn cmd_contents(doc: &Document, json: bool) -> Result<()> {
    let report = list_contents(doc);
    if json {
        return print_json(&report);
    }
    for page in &report.pages {
        println!("[*] page object {} -> {:?}", page.page, page.contents);
    }
    for shared in &report.shared {
        println!("[!] stream {} used by {} page(s)", shared.object, shared.uses);
    }
    for err in &report.errors {
        println!("[!] {err}");
    }
    Ok(())
}

fn cmd_smask(doc: &Document, json: bool) -> Result<()> {
    let report = smask_graph(doc);
    if json {
        return print_json(&report);
    }
    for edge in &report.edges {
        println!("[*] object {} /SMask -> object {}", edge.object, edge.smask);
    }
    for object in &report.unresolved {
        println!("[!] object {object} /SMask is inline or not a direct reference");
    }
    for err in &report.errors {
        println!("[!] {err}");
    }
    if report.edges.is_empty() && report.unresolved.is_empty() {
        println!("[*] no /SMask entries");
    }
    Ok(())
}

fn cmd_stats(doc: &Document, object: u32, min_run: usize, json: bool) -> Result<()> {
    let stats = match stream_stats(doc, object, min_run) {
        Ok(stats) => stats,
        Err(err) => {
            eprintln!("[!] {err}");
            return Ok(());
        }
    };
    if json {
        return print_json(&stats);
    }
    let Some(stats) = stats else {
        println!("[!] object {object} has no stream");
        return Ok(());
    };
    println!("[*] object {}: {} raw byte(s)", stats.object, stats.raw_len);
    if let Some(len) = stats.decoded_len {
        println!("[*] decodes to {len} byte(s)");
    }
    if let Some(err) = &stats.decode_error {
        println!("[!] does not decode: {err}");
    }
    println!("[*] entropy of leading sample: {:.2} bits/byte", stats.entropy);
    println!("[*] distinct byte values in head: {}", stats.distinct_leading_bytes);
    if stats.ascii_runs.is_empty() {
        println!("[*] no printable runs of {min_run}+ byte(s)");
    } else {
        for run in &stats.ascii_runs {
            println!("[!] run at offset {} ({} bytes): {}", run.offset, run.len, run.text);
        }
    }
    Ok(())
}
