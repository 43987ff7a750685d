use clap::Parser;
use engine::{Engine, Preselection, RequestKind};
use midi::MidiSession;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use webserver::{Clients, ServerMessageKind};

pub mod engine;
pub mod error;
pub mod instrument;
pub mod midi;
pub mod router;
pub mod sequencer;
mod webserver;

const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(about = "Routes a wind controller to a multi-timbral synthesizer.")]
pub struct Args {
    #[arg(short, long, default_value_t = 3000, help = "Websocket control port")]
    port: u16,

    #[arg(short, long, help = "Input device to connect when discovered")]
    input: Option<String>,

    #[arg(short, long, help = "Output device to connect when discovered")]
    output: Option<String>,

    #[arg(long, default_value = "info", help = "trace, debug, info, warn or error")]
    log_level: String,

    #[arg(long, default_value_t = 32, help = "Capacity of the internal channels")]
    channel_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level.parse::<Level>()?)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting windlayer > version: {}", VERSION.unwrap_or("?"));

    let (frame_tx, frame_rx) = midi::create_channel(args.channel_capacity);
    let (req_tx, req_rx) = engine::create_request_channel(args.channel_capacity);
    let (report_tx, report_rx) = engine::create_report_channel(args.channel_capacity * 8);

    let engine = Engine::new(
        MidiSession::new(frame_tx),
        frame_rx,
        req_rx,
        report_tx,
        Preselection {
            input: args.input,
            output: args.output,
        },
    );
    tokio::spawn(engine.run());

    engine::send_request(&req_tx, RequestKind::Discover).await;

    let clients = Clients::new(256);
    tokio::spawn(run_report_forwarder(report_rx, clients.clone()));

    let shared_state = webserver::SharedState {
        clients: Clients::clone(&clients),
        requester: req_tx.clone(),
    };

    webserver::run(args.port, shared_state, move |addr, req| {
        let req_tx = req_tx.clone();
        async move {
            use webserver::ClientMessageKind;
            match req {
                ClientMessageKind::Ping => ServerMessageKind::Pong,
                ClientMessageKind::Report(report) => {
                    info!("Report from [{addr}]: {report}");
                    ServerMessageKind::Ack
                }
                ClientMessageKind::Engine(req) => match engine::send_request(&req_tx, req).await {
                    Some(res) => ServerMessageKind::EngineResponse(res),
                    None => ServerMessageKind::Nak,
                },
            }
        }
    })
    .await?;

    Ok(())
}

async fn run_report_forwarder(mut report_rx: engine::ReportReceiver, mut clients: Clients) {
    use tokio::sync::broadcast::error::RecvError;
    loop {
        match report_rx.recv().await {
            Ok(report) => clients.broadcast(ServerMessageKind::EngineReport(report)),
            Err(RecvError::Lagged(count)) => {
                tracing::debug!("Report forwarder skipped {count} reports")
            }
            Err(RecvError::Closed) => break,
        }
    }
}
