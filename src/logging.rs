use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
};
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket, Route,
};

use crate::model::auth::AUTH_TOKEN_COOKIE;
use crate::store::Store;
use crate::Config;

/// Header echoing the request's log ID back to the client.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

const CONSOLE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

/// Set up logging from the given log4rs config file, falling back to plain
/// console output if the file is missing or invalid.
pub fn init(config_path: &str) {
    match log4rs::init_file(config_path, log4rs_dynamic_filters::default_deserializers()) {
        Ok(()) => info!("Initialised logging from {config_path}"),
        Err(file_err) => match init_console() {
            Ok(()) => warn!("Could not use {config_path} ({file_err}); logging to console"),
            Err(e) => eprintln!("Failed to initialise logging: {e}"),
        },
    }
}

/// Log `info` and above to stdout, keeping Rocket's own chatter to warnings.
fn init_console() -> Result<(), Box<dyn std::error::Error>> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .logger(Logger::builder().build("rocket", LevelFilter::Warn))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    Ok(())
}

/// A unique identifier for a particular request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Allow the ID to be accessed via request guard.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r RequestId {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(req.local_cache(RequestId::next))
    }
}

/// When the current request reached the server.
struct Received(Instant);

/// Describe the route that handled a request, for response log lines.
fn route_label(route: Option<&Route>) -> String {
    match route {
        Some(route) => match route.name {
            Some(ref name) => format!("{name} ({})", route.uri),
            None => route.uri.to_string(),
        },
        None => "no matching route".to_string(),
    }
}

/// Logs every request and response under a per-request ID, and announces which
/// store the polls are served from.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let protocol = if rocket.config().tls_enabled() {
            "https"
        } else {
            "http"
        };
        let ip = &rocket.config().address;
        let port = &rocket.config().port;
        let backend = rocket.state::<Store>().map_or("no", |store| store.backend());
        info!("Polls open on {protocol}://{ip}:{port} with {backend} storage");
        if let Some(config) = rocket.state::<Config>() {
            info!(
                "Index lists the latest {} questions; questions take at most {} choices",
                config.latest_count(),
                config.max_choices()
            );
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        req.local_cache(|| Received(Instant::now()));
        let id = req.local_cache(RequestId::next);
        let method = req.method();
        let uri = req.uri();
        let session = if req.cookies().get(AUTH_TOKEN_COOKIE).is_some() {
            " (admin session)"
        } else {
            ""
        };
        info!("->req{id} {method} {uri}{session}");
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = req.local_cache(RequestId::next);
        res.set_raw_header(REQUEST_ID_HEADER, id.to_string());

        let elapsed = req.local_cache(|| Received(Instant::now())).0.elapsed();
        let code = res.status();
        let route = route_label(req.route());
        let log_msg = format!("<-rsp{id} {code} {route} in {}ms", elapsed.as_millis());
        match code.class() {
            StatusClass::ServerError => error!("{log_msg}"),
            StatusClass::ClientError => warn!("{log_msg}"),
            _ => info!("{log_msg}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, closing the polls gracefully...");
    }
}

#[cfg(test)]
mod tests {
    use rocket::local::asynchronous::Client;

    use super::*;

    #[test]
    fn unmatched_requests_are_labelled() {
        assert_eq!(route_label(None), "no matching route");
    }

    #[test]
    fn request_ids_increase() {
        let first = RequestId::next();
        let second = RequestId::next();
        assert!(second > first);
    }

    #[backend_test]
    async fn responses_carry_request_id(client: Client) {
        let first = client.get("/polls").dispatch().await;
        let second = client.get("/polls").dispatch().await;

        let first_id: usize = first
            .headers()
            .get_one(REQUEST_ID_HEADER)
            .unwrap()
            .parse()
            .unwrap();
        let second_id: usize = second
            .headers()
            .get_one(REQUEST_ID_HEADER)
            .unwrap()
            .parse()
            .unwrap();
        assert_ne!(first_id, second_id);
    }
}
