use argh::FromArgs;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use optical_link::codec;
use optical_link::node::{estimate_duration, validate_bit_duration, validate_message};
use optical_link::node::{Receiver, SamplerConfig, Transmitter, TransmitOutcome};
use optical_link::node::{DEFAULT_BIT_DURATION_MS, STABLE_FRAMES_NEEDED};
use optical_link::optics::scripted::{script_for_bits, ScriptedCapture, LOW_LEVEL};
use optical_link::optics::{DisplaySurface, LogSink, Luminance};

#[macro_use]
extern crate nolog;

const DEFAULT_FRAMES_PER_BIT: usize = 4;
const DEFAULT_LEAD_IN_FRAMES: usize = 10;
const REPLAY_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

#[derive(FromArgs)]
#[argh(description = "send and receive text over a flickering screen")]
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Encode(EncodeArgs),
    Decode(DecodeArgs),
    Send(SendArgs),
    Replay(ReplayArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "encode")]
#[argh(description = "print the frame bits of a message")]
struct EncodeArgs {
    #[argh(positional)]
    #[argh(description = "text to encode")]
    message: String,

    #[argh(option, short = 'd')]
    #[argh(description = "bit duration in milliseconds, for the time estimate")]
    #[argh(default = "DEFAULT_BIT_DURATION_MS")]
    bit_duration: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "decode")]
#[argh(description = "decode the first frame found in a string of 0 and 1")]
struct DecodeArgs {
    #[argh(positional)]
    #[argh(description = "frame bits, e.g. 11110000...00001111")]
    bits: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "send")]
#[argh(description = "flicker a message on this terminal")]
struct SendArgs {
    #[argh(positional)]
    #[argh(description = "text to send")]
    message: String,

    #[argh(option, short = 'd')]
    #[argh(description = "bit duration in milliseconds (50-1000)")]
    #[argh(default = "DEFAULT_BIT_DURATION_MS")]
    bit_duration: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "replay")]
#[argh(description = "feed a message through the receiver with a scripted camera")]
struct ReplayArgs {
    #[argh(positional)]
    #[argh(description = "text to replay")]
    message: String,

    #[argh(option, short = 'f')]
    #[argh(description = "camera frames per transmitted bit")]
    #[argh(default = "DEFAULT_FRAMES_PER_BIT")]
    frames_per_bit: usize,

    #[argh(option, short = 'l')]
    #[argh(description = "dark frames before the message starts")]
    #[argh(default = "DEFAULT_LEAD_IN_FRAMES")]
    lead_in: usize,
}

/// Renders each bit as one block character.
struct TerminalDisplay;

impl DisplaySurface for TerminalDisplay {
    fn open(&mut self) {
        print!("[");
    }

    fn set_state(&mut self, state: Luminance) {
        let symbol = match state {
            Luminance::High => '█',
            Luminance::Low => '·',
        };
        print!("{}", symbol);
        let _ = std::io::stdout().flush();
    }

    fn close(&mut self) {
        println!("]");
    }
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let result = match args.command {
        Command::Encode(args) => encode(args),
        Command::Decode(args) => decode(args),
        Command::Send(args) => send(args),
        Command::Replay(args) => replay(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn encode(args: EncodeArgs) -> Result<(), String> {
    let bit_duration = validate_bit_duration(args.bit_duration).map_err(|err| err.to_string())?;
    let frame = codec::encode(&args.message);

    println!("{}", codec::bits_to_string(&frame));
    println!(
        "{} characters, {} bits, {:.1} seconds at {} ms per bit",
        args.message.chars().count(),
        frame.len(),
        estimate_duration(&args.message, bit_duration).as_secs_f32(),
        args.bit_duration
    );
    Ok(())
}

fn decode(args: DecodeArgs) -> Result<(), String> {
    let bits = codec::bits_from_str(args.bits.trim()).map_err(|err| err.to_string())?;
    let message = codec::decode(&bits).map_err(|err| err.to_string())?;
    println!("{}", message);
    Ok(())
}

fn send(args: SendArgs) -> Result<(), String> {
    let transmitter = Transmitter::new(TerminalDisplay);

    match transmitter.send(&args.message, args.bit_duration, &LogSink) {
        Ok(TransmitOutcome::Completed { bits }) => {
            info!("Sent {} bits", bits);
            Ok(())
        }
        Ok(outcome) => Err(format!("Transmission did not complete: {:?}", outcome)),
        Err(err) => Err(err.to_string()),
    }
}

fn replay(args: ReplayArgs) -> Result<(), String> {
    validate_message(&args.message).map_err(|err| err.to_string())?;
    if args.frames_per_bit < STABLE_FRAMES_NEEDED {
        return Err(format!(
            "Need at least {} frames per bit to survive debouncing",
            STABLE_FRAMES_NEEDED
        ));
    }

    let frame = codec::encode(&args.message);
    let script = std::iter::repeat(LOW_LEVEL)
        .take(args.lead_in)
        .chain(script_for_bits(&frame, args.frames_per_bit))
        .collect::<Vec<_>>();

    // Four sample intervals per scripted frame, plus a second of slack.
    let timeout = REPLAY_SAMPLE_INTERVAL * (script.len() as u32 * 4) + Duration::from_secs(1);

    let config = SamplerConfig::default().with_sample_interval(REPLAY_SAMPLE_INTERVAL);
    let receiver = Receiver::new(config);
    receiver
        .start(ScriptedCapture::new(script), LogSink)
        .map_err(|err| err.to_string())?;

    let received = receiver.recv_timeout(timeout);
    receiver.stop();

    match received {
        Some(message) => {
            println!("{}", message);
            Ok(())
        }
        None => Err("No frame recovered from the scripted capture".to_string()),
    }
}
