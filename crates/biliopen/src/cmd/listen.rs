use biliopen_live::{channel, Client, ClientConfig};
use tokio::sync::mpsc;
use tracing::info;

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{client_error, live_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_event, OutputFormat};

const EVENT_BUFFER: usize = 256;

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let app_heartbeat_interval = if args.no_app_heartbeat {
        None
    } else {
        Some(parse_duration(
            "app heartbeat interval",
            &args.app_heartbeat_interval,
        )?)
    };
    let config = ClientConfig::new(args.app_key.clone(), args.app_secret.clone(), args.project_id)
        .with_api_host(args.api_host.clone())
        .with_heartbeat_interval(parse_duration("heartbeat interval", &args.heartbeat_interval)?)
        .with_app_heartbeat_interval(app_heartbeat_interval);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))?;
    runtime.block_on(listen(&args.code, args.count, config, format))
}

async fn listen(
    code: &str,
    count: Option<usize>,
    config: ClientConfig,
    format: OutputFormat,
) -> CliResult<i32> {
    let (handler, mut events) = channel(EVENT_BUFFER);
    let (closed_tx, mut closed) = mpsc::unbounded_channel();
    let client = Client::new(config, handler)
        .map_err(|err| client_error("client setup failed", err))?
        .with_close_handler(move |err| {
            let _ = closed_tx.send(err);
        });

    client
        .connect(code)
        .await
        .map_err(|err| client_error("connect failed", err))?;
    if let Some(session) = client.session().await {
        info!(
            room_id = session.anchor.room_id,
            anchor = %session.anchor.uname,
            "listening, press Ctrl-C to stop"
        );
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut printed = 0usize;
    let result = loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                break match signal {
                    Ok(()) => {
                        info!("interrupted");
                        Ok(SUCCESS)
                    }
                    Err(err) => Err(CliError::new(
                        INTERNAL,
                        format!("signal handler setup failed: {err}"),
                    )),
                };
            }
            Some(err) = closed.recv() => {
                break Err(live_error("connection closed", err));
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break Ok(SUCCESS);
                };
                print_event(&event, format);
                printed = printed.saturating_add(1);
                if count.is_some_and(|count| printed >= count) {
                    break Ok(SUCCESS);
                }
            }
        }
    };

    client.disconnect().await;
    result
}
