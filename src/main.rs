// src/main.rs
//
// Command-line front end: convert between frame formats, preview frames,
// list serial ports and listen to a device (or stdin) through the pipeline.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use leddot_lib::codec::{
    decode_legacy_style_text, decode_token_line, export_text, file_contents, FRAME128_LEN, FRAME64_LEN,
    LEGACY_TEXT_LEN,
};
use leddot_lib::io::pipeline::apply_event;
use leddot_lib::io::{
    list_serial_ports, open_serial_transport, ChannelFeeder, ChannelTransport, EndReason, Transport,
};
use leddot_lib::legacy_hex::{decode_classified, scan_c_array_literals};
use leddot_lib::logging::{init_file_logging, stop_file_logging};
use leddot_lib::settings::{default_settings_path, load_settings, AppSettings};
use leddot_lib::{tlog, Bitmap, PipelineEvent, SerialPipeline, TextFormat, COLS, ROWS};

#[derive(Parser)]
#[command(name = "leddot", version, about = "16x32 LED matrix frame tool")]
struct Cli {
    #[arg(help = "Settings file (defaults to the user config dir)", long, global = true)]
    settings: Option<PathBuf>,

    #[arg(help = "Write a timestamped log file into this directory", long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Decode a frame file (or - for stdin) and re-export it")]
    Convert {
        input: PathBuf,

        #[arg(help = "token_line, token_line_padded, legacy_text, c_array, c_array_block, matrix", long)]
        to: Option<TextFormat>,

        #[arg(help = "Keep byte order within each row on C-array export", long, default_value_t = false)]
        no_swap_pairs: bool,

        #[arg(help = "Mirror the four pixel bits of every exported byte", long, default_value_t = false)]
        reverse_nibble: bool,

        #[arg(help = "Invert the four pixel bits of every exported byte", long, default_value_t = false)]
        invert_bits: bool,

        #[arg(help = "Write to this file instead of stdout", short, long)]
        output: Option<PathBuf>,
    },

    #[command(about = "Print a text preview of a frame file")]
    Show { input: PathBuf },

    #[command(about = "List serial ports")]
    Ports,

    #[command(about = "Decode frames arriving on a serial port or stdin")]
    Listen {
        #[arg(long)]
        port: Option<String>,

        #[arg(long)]
        baud: Option<u32>,

        #[arg(help = "Read lines from stdin instead of a serial port", long, default_value_t = false)]
        stdin: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = run(cli).await;
    stop_file_logging();

    if let Err(e) = result {
        tlog!("[leddot] {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let settings = load_settings(&settings_path)?;

    if let Some(log_dir) = cli.log_dir.clone().or_else(|| settings.log_dir.clone().map(PathBuf::from)) {
        init_file_logging(&log_dir, settings.log_keep)?;
    }

    match cli.command {
        Commands::Convert {
            input,
            to,
            no_swap_pairs,
            reverse_nibble,
            invert_bits,
            output,
        } => {
            let bitmap = decode_input(&read_input(&input)?)?;

            let mut options = settings.export.frame128_options();
            if no_swap_pairs {
                options.swap_pairs = false;
            }
            options.reverse_nibble |= reverse_nibble;
            options.invert_bits |= invert_bits;

            let format = to.unwrap_or_else(|| configured_format(&settings));
            match output {
                Some(path) => {
                    std::fs::write(&path, file_contents(&bitmap, format, options))
                        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
                    tlog!("[convert] Wrote {} ({})", path.display(), format.as_str());
                }
                None => println!("{}", export_text(&bitmap, format, options)),
            }
            Ok(())
        }
        Commands::Show { input } => {
            let bitmap = decode_input(&read_input(&input)?)?;
            println!("{}", bitmap);
            println!("{} of {} pixels lit", bitmap.lit_count(), ROWS * COLS);
            Ok(())
        }
        Commands::Ports => {
            let ports = list_serial_ports()?;
            if ports.is_empty() {
                println!("No serial ports found");
            }
            for port in ports {
                match (port.vid, port.pid) {
                    (Some(vid), Some(pid)) => println!(
                        "{}  {}  {:04x}:{:04x}  {}",
                        port.port_name,
                        port.port_type,
                        vid,
                        pid,
                        port.product.unwrap_or_default()
                    ),
                    _ => println!("{}  {}", port.port_name, port.port_type),
                }
            }
            Ok(())
        }
        Commands::Listen { port, baud, stdin } => listen(&settings, port, baud, stdin).await,
    }
}

/// Format from settings; a C array follows the single-line preference.
fn configured_format(settings: &AppSettings) -> TextFormat {
    match settings.export.format {
        TextFormat::CArray if !settings.export.single_line => TextFormat::CArrayBlock,
        format => format,
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>, String> {
    if path.as_os_str() == "-" {
        let mut data = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin(), &mut data)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(data);
    }
    std::fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

// ============================================================================
// Input detection
// ============================================================================

/// Decode a whole input file.
///
/// A newline-free 64 byte input, a newline-free 128 byte input that is not
/// legacy text, or anything that is not plain text, is a raw frame. Text is tried as C array literals, then a 0/1 matrix,
/// then the first non-blank line as legacy text (exactly 128 characters), a
/// token line (16 tokens) or a legacy hex dump.
fn decode_input(data: &[u8]) -> Result<Bitmap, String> {
    if data.is_empty() {
        return Err("Input is empty".to_string());
    }
    if is_raw_frame(data) {
        return Ok(decode_classified(data));
    }

    let text = String::from_utf8_lossy(data);

    let literals = scan_c_array_literals(&text);
    if !literals.is_empty() {
        return Ok(decode_classified(&literals));
    }

    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        return decode_matrix(trimmed);
    }

    let line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| "Input has no frame data".to_string())?;

    if line.len() != LEGACY_TEXT_LEN && is_token_line(line) {
        Ok(decode_token_line(line))
    } else {
        Ok(decode_legacy_style_text(line))
    }
}

/// Raw frames may happen to be all printable bytes, so a 64 or 128 byte input
/// without a newline is raw. The one exception is 128 characters that read as
/// legacy text cells.
fn is_raw_frame(data: &[u8]) -> bool {
    let is_text = data
        .iter()
        .all(|&b| b.is_ascii_graphic() || b.is_ascii_whitespace());
    if !is_text {
        return true;
    }
    if data.contains(&b'\n') {
        return false;
    }
    match data.len() {
        FRAME64_LEN => true,
        FRAME128_LEN => !is_legacy_text_cells(data),
        _ => false,
    }
}

/// Every two-character cell is two hex digits or one hex digit and a space.
fn is_legacy_text_cells(data: &[u8]) -> bool {
    data.chunks(2).all(|cell| match cell {
        [hi, lo] => hi.is_ascii_hexdigit() && (lo.is_ascii_hexdigit() || *lo == b' '),
        _ => false,
    })
}

fn is_token_line(line: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens.len() == ROWS
        && tokens
            .iter()
            .all(|t| t.len() <= 8 && t.chars().all(|c| c.is_ascii_hexdigit()))
}

fn decode_matrix(text: &str) -> Result<Bitmap, String> {
    let json = text.trim_end_matches(';');
    let cells: Vec<Vec<u8>> =
        serde_json::from_str(json).map_err(|e| format!("Failed to parse matrix: {}", e))?;

    Ok(Bitmap::from_fn(|row, col| {
        cells
            .get(row)
            .and_then(|r| r.get(col))
            .map_or(false, |&v| v != 0)
    }))
}

// ============================================================================
// Listen
// ============================================================================

async fn listen(settings: &AppSettings, port: Option<String>, baud: Option<u32>, stdin: bool) -> Result<(), String> {
    let (mut pipeline, mut events) = SerialPipeline::new();
    let mut stdin_task = None;

    let transport: Box<dyn Transport> = if stdin {
        let (transport, feeder) = ChannelTransport::new("stdin");
        stdin_task = Some(tokio::spawn(pump_stdin(feeder)));
        Box::new(transport)
    } else {
        let port = port
            .or_else(|| settings.serial.port.clone())
            .ok_or_else(|| "No port given; use --port or set serial.port in settings".to_string())?;
        let mut serial = settings.serial.clone();
        if let Some(baud) = baud {
            serial.baud_rate = baud;
        }
        open_serial_transport(&port, &serial)?
    };

    pipeline.connect(transport).await?;

    let mut live = Bitmap::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut failure = None;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tlog!("[listen] Interrupted");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                if apply_event(&mut live, &event) {
                    if let PipelineEvent::Frame(decoded) = &event {
                        println!(
                            "frame {} ({:?}, {} bytes)",
                            pipeline.frames_decoded(),
                            decoded.source,
                            decoded.byte_count
                        );
                    }
                    println!("{}\n", live);
                }
                if let PipelineEvent::Ended(ended) = event {
                    if ended.reason == EndReason::Error {
                        failure = ended.message;
                    }
                    break;
                }
            }
        }
    }

    let result = pipeline.disconnect().await;
    if let Some(task) = stdin_task {
        task.abort();
    }
    result?;

    match failure {
        Some(message) => Err(message),
        None => Ok(()),
    }
}

async fn pump_stdin(feeder: ChannelFeeder) {
    let mut stdin = tokio::io::stdin();
    let mut buf = vec![0u8; 1024];

    loop {
        match stdin.read(&mut buf).await {
            Ok(0) => {
                feeder.finish();
                break;
            }
            Ok(n) => {
                if !feeder.send_bytes(buf[..n].to_vec()) {
                    break;
                }
            }
            Err(e) => {
                feeder.send_failure(e.to_string());
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leddot_lib::codec::{
        encode_frame128, encode_frame64, encode_legacy_style_text, export_matrix, Frame128Options,
    };

    fn sample() -> Bitmap {
        Bitmap::from_fn(|row, col| (row * 3 + col) % 5 == 0)
    }

    #[test]
    fn test_decode_token_line_input() {
        let text = file_contents(&sample(), TextFormat::TokenLine, Frame128Options::default());
        assert_eq!(decode_input(text.as_bytes()).unwrap(), sample());
    }

    #[test]
    fn test_decode_legacy_text_input() {
        let text = file_contents(&sample(), TextFormat::LegacyText, Frame128Options::default());
        assert_eq!(decode_input(text.as_bytes()).unwrap(), sample());
    }

    #[test]
    fn test_decode_c_array_block_input() {
        let text = file_contents(&sample(), TextFormat::CArrayBlock, Frame128Options::default());
        assert_eq!(decode_input(text.as_bytes()).unwrap(), sample());
    }

    #[test]
    fn test_decode_matrix_input() {
        let text = export_matrix(&sample());
        assert_eq!(decode_input(text.as_bytes()).unwrap(), sample());
    }

    #[test]
    fn test_decode_binary_input() {
        let frame128 = encode_frame128(&sample(), Frame128Options::default());
        assert_eq!(decode_input(&frame128).unwrap(), sample());

        let frame64 = encode_frame64(&sample());
        assert_eq!(decode_input(&frame64).unwrap(), sample());
    }

    #[test]
    fn test_decode_printable_binary_input() {
        // Every byte is 'A', so the frames look like text.
        let image = Bitmap::from_row_values([0x4141_4141; ROWS]);
        let frame64 = encode_frame64(&image);
        assert!(frame64.iter().all(|b| b.is_ascii_graphic()));
        assert_eq!(decode_input(&frame64).unwrap(), image);

        // 'G' carries nibble 7 in its low bits and is not a hex digit.
        let frame128 = vec![b'G'; FRAME128_LEN];
        let expected = Bitmap::from_row_values([0x7777_7777; ROWS]);
        assert_eq!(decode_input(&frame128).unwrap(), expected);
    }

    #[test]
    fn test_unterminated_legacy_text_is_text() {
        let text = encode_legacy_style_text(&sample());
        assert_eq!(text.len(), LEGACY_TEXT_LEN);
        assert_eq!(decode_input(text.as_bytes()).unwrap(), sample());
    }

    #[test]
    fn test_legacy_text_line_with_newline_is_text() {
        let text = file_contents(&sample(), TextFormat::LegacyText, Frame128Options::default());
        assert!(text.ends_with('\n'));
        assert_eq!(decode_input(text.as_bytes()).unwrap(), sample());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(decode_input(b"").is_err());
        assert!(decode_input(b"\r\n\r\n").is_err());
    }

    #[test]
    fn test_bit_options_touch_only_pixel_nibble() {
        use clap::CommandFactory;

        let command = Cli::command();
        let convert = command
            .get_subcommands()
            .find(|c| c.get_name() == "convert")
            .unwrap();
        for id in ["reverse_nibble", "invert_bits"] {
            let arg = convert.get_arguments().find(|a| a.get_id() == id).unwrap();
            assert!(arg.get_help().unwrap().to_string().contains("four pixel bits"));
        }

        // Leftmost pixel only: bit 0 of the first byte
        let image = Bitmap::from_row_values([1; ROWS]);
        let reversed = Frame128Options {
            swap_pairs: false,
            reverse_nibble: true,
            invert_bits: false,
        };
        assert_eq!(encode_frame128(&image, reversed)[0], 0x08);

        let inverted = Frame128Options {
            swap_pairs: false,
            reverse_nibble: false,
            invert_bits: true,
        };
        let bytes = encode_frame128(&image, inverted);
        assert_eq!(bytes[0], 0x0E);
        assert_eq!(bytes[1], 0x0F);
    }

    #[test]
    fn test_configured_format_honours_single_line() {
        let mut settings = AppSettings::default();
        settings.export.format = TextFormat::CArray;
        assert_eq!(configured_format(&settings), TextFormat::CArray);
        settings.export.single_line = false;
        assert_eq!(configured_format(&settings), TextFormat::CArrayBlock);
    }
}
