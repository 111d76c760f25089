mod common;

use std::time::Duration;

use common::{
    FailingSink, FakeHost, FakeProvider, RecordingDispatcher, RecordingPause, Reply, day,
    ohlc_point,
};
use quote_loader::catalog::Catalog;
use quote_loader::config::OutputConfig;
use quote_loader::dispatch::MailSubjects;
use quote_loader::io::sink::CsvArtifactSink;
use quote_loader::models::date_range::DateRange;
use quote_loader::models::instrument::{Instrument, InstrumentClass};
use quote_loader::runner::{Loader, RunError, RunParams};
use quote_loader::session::{SessionManager, SessionMode, SessionState, SessionTimings};
use secrecy::SecretString;
use tempfile::tempdir;

const TYPE_DELAY: Duration = Duration::from_secs(2);

fn params(range: DateRange) -> RunParams {
    RunParams {
        range,
        classes: vec![InstrumentClass::Fx, InstrumentClass::Gas],
        mode: SessionMode::DataOnly,
        retry: 3,
        retry_delay: Duration::from_secs(15),
        type_delay: TYPE_DELAY,
        instrument_delay: Duration::from_secs(1),
    }
}

fn catalog() -> Catalog {
    Catalog::new([Instrument::fx("USDEUR=R"), Instrument::gas("TRNLTTFD1", false, None)])
        .unwrap()
}

#[tokio::test]
async fn chunks_are_processed_in_order_class_by_class() {
    let dir = tempdir().unwrap();
    let sink = CsvArtifactSink::new(OutputConfig {
        fx_folder: dir.path().join("fx"),
        gas_folder: dir.path().join("gas"),
        ..OutputConfig::default()
    });
    let catalog = catalog();
    let provider = FakeProvider::new().series(
        "USDEUR=R",
        vec![Reply::Points(vec![ohlc_point(day(2024, 1, 2), 0.91)])],
    );
    let dispatcher = RecordingDispatcher::default();
    let pause = RecordingPause::default();
    let loader = Loader {
        catalog: &catalog,
        provider: &provider,
        sink: &sink,
        dispatcher: &dispatcher,
        pause: &pause,
    };

    let range = DateRange::new(day(2024, 1, 1), day(2024, 3, 10)).unwrap();
    let results = loader.load(&params(range)).await.unwrap();

    assert_eq!(results.len(), 6);
    let subjects: Vec<String> = dispatcher.calls().into_iter().map(|c| c.subject).collect();
    assert_eq!(
        subjects,
        vec![
            "FX rates for 2024-01-01 - 2024-01-31",
            "Gas prices for 2024-01-01 - 2024-01-31",
            "FX rates for 2024-02-01 - 2024-02-29",
            "Gas prices for 2024-02-01 - 2024-02-29",
            "FX rates for 2024-03-01 - 2024-03-10",
            "Gas prices for 2024-03-01 - 2024-03-10",
        ]
    );
    assert_eq!(pause.count_of(TYPE_DELAY), 3);
    assert_eq!(results[1].errors, vec!["no data for TRNLTTFD1".to_string()]);
}

#[tokio::test]
async fn single_class_runs_have_no_type_delay() {
    let catalog = catalog();
    let provider = FakeProvider::new();
    let dispatcher = RecordingDispatcher::default();
    let pause = RecordingPause::default();
    let loader = Loader {
        catalog: &catalog,
        provider: &provider,
        sink: &FailingSink,
        dispatcher: &dispatcher,
        pause: &pause,
    };

    let mut run = params(DateRange::single_day(day(2024, 1, 1)));
    run.classes = vec![InstrumentClass::Gas];
    let results = loader.load(&run).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(pause.count_of(TYPE_DELAY), 0);
    assert_eq!(provider.series_calls("USDEUR=R"), 0);
}

#[tokio::test]
async fn failed_chunk_is_reported_and_the_session_closed() {
    let catalog = catalog();
    let provider = FakeProvider::new().series(
        "USDEUR=R",
        vec![Reply::Points(vec![ohlc_point(day(2024, 1, 2), 0.91)])],
    );
    let dispatcher = RecordingDispatcher::default();
    let pause = RecordingPause::default();
    let host = FakeHost::new(&[false], 0);
    let loader = Loader {
        catalog: &catalog,
        provider: &provider,
        sink: &FailingSink,
        dispatcher: &dispatcher,
        pause: &pause,
    };
    let mut session = SessionManager::new(
        &host,
        &pause,
        &dispatcher,
        None,
        SecretString::from("app-key".to_string()),
        SessionTimings {
            login_wait: Duration::from_secs(25),
            app_wait: Duration::from_secs(50),
        },
        SessionMode::Full,
    );

    let range = DateRange::new(day(2024, 1, 1), day(2024, 2, 15)).unwrap();
    let mut run = params(range);
    run.mode = SessionMode::Full;
    let err = loader.run(&mut session, &run).await.unwrap_err();

    assert!(matches!(err, RunError::Orchestration(_)));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(host.calls().last(), Some(&"terminate"));

    let calls = dispatcher.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].subject, "FX rates for 2024-01-01 - 2024-01-31");
    assert_eq!(calls[0].artifact, None);
    assert_eq!(calls[1].subject, MailSubjects::LOAD_FAILED);
    assert!(calls[1].errors[0].contains("Start date: 01.01.2024 End date: 31.01.2024"));
    assert!(calls[1].errors[0].contains("No space left on device"));
    assert_eq!(provider.series_calls("TRNLTTFD1"), 0);
}

#[tokio::test]
async fn session_failure_skips_loading() {
    let catalog = catalog();
    let provider = FakeProvider::new();
    let dispatcher = RecordingDispatcher::default();
    let pause = RecordingPause::default();
    let host = FakeHost::new(&[], 2);
    let loader = Loader {
        catalog: &catalog,
        provider: &provider,
        sink: &FailingSink,
        dispatcher: &dispatcher,
        pause: &pause,
    };
    let mut session = SessionManager::new(
        &host,
        &pause,
        &dispatcher,
        None,
        SecretString::from("app-key".to_string()),
        SessionTimings {
            login_wait: Duration::from_secs(25),
            app_wait: Duration::from_secs(50),
        },
        SessionMode::DataOnly,
    );

    let err = loader
        .run(&mut session, &params(DateRange::single_day(day(2024, 1, 1))))
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 3);
    assert!(provider.requests.lock().unwrap().is_empty());
    assert_eq!(dispatcher.calls()[0].subject, MailSubjects::CONNECT_FAILED);
}
