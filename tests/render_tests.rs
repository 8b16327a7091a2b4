mod common;

use std::sync::Arc;

use common::{encode, init_tracing};
use ultralog::render::text::escape;
use ultralog::{
    ColorMode, Config, DecodeError, Error, Field, Level, LogfmtRenderer, Logger, TerminalRenderer,
};

fn terminal_line(record: &[u8]) -> String {
    let renderer = TerminalRenderer::new(Vec::new(), false).with_utc(true);
    renderer.write(record).unwrap();
    String::from_utf8(renderer.into_inner()).unwrap()
}

fn logfmt_line(record: &[u8]) -> String {
    let renderer = LogfmtRenderer::new(Vec::new()).with_utc(true);
    renderer.write(record).unwrap();
    String::from_utf8(renderer.into_inner()).unwrap()
}

/// `MM-DD|HH:MM:SS`
fn is_default_timestamp(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 14
        && b.iter().enumerate().all(|(i, &c)| match i {
            2 => c == b'-',
            5 => c == b'|',
            8 | 11 => c == b':',
            _ => c.is_ascii_digit(),
        })
}

#[test]
fn test_escape() {
    assert_eq!(&*escape(b"simple"), b"simple");
    assert_eq!(&*escape(b"a\"b"), b"\"a\\\"b\"");
    assert_eq!(&*escape(b"a b"), b"\"a b\"");
}

#[test]
fn test_logger_to_terminal_end_to_end() {
    init_tracing();
    let renderer = Arc::new(TerminalRenderer::new(Vec::new(), false));
    let logger = Logger::with_sink(renderer.clone());
    logger.set_level(Level::Info);

    logger.log(
        Level::Info,
        "svc started",
        &[Field::str("env", "prod"), Field::int("pid", 123)],
    );
    drop(logger);

    let output = match Arc::try_unwrap(renderer) {
        Ok(renderer) => renderer.into_inner(),
        Err(_) => panic!("renderer still shared"),
    };
    let line = String::from_utf8(output).unwrap();

    let rest = line.strip_prefix("INFO [").unwrap();
    let (timestamp, rest) = rest.split_at(14);
    assert!(is_default_timestamp(timestamp), "timestamp {:?}", timestamp);
    let expected = format!("] svc started{}env=prod pid=123\n", " ".repeat(40 - 11));
    assert_eq!(rest, expected);
}

#[test]
fn test_terminal_value_formats() {
    let record = encode(
        Level::Debug,
        1,
        b"values",
        &[
            Field::bytes("blob", &[0xde, 0xad, 0x01]),
            Field::float64("ratio", 1.23456),
            Field::float32("half", 0.5),
            Field::bool("ok", true),
            Field::uint("big", u64::MAX),
            Field::str("path", "/a b"),
            Field::str("quote", "say \"hi\""),
        ],
    );
    let line = terminal_line(&record);
    let fields = line.split_at(line.find("values").unwrap() + 40).1;
    assert_eq!(
        fields,
        "blob=dead01 ratio=1.235 half=0.500 ok=true big=18446744073709551615 path=\"/a b\" quote=\"say \\\"hi\\\"\"\n"
    );
}

#[test]
fn test_truncated_field_renders_placeholder() {
    let record = encode(Level::Warn, 1, b"torn", &[Field::int("a", 1), Field::int("b", 2)]);
    let torn = &record[..record.len() - 3];

    let line = terminal_line(torn);
    assert!(line.ends_with("a=1 b=?\n"), "{:?}", line);

    let line = logfmt_line(torn);
    assert!(line.ends_with(" a=1 b=?\n"), "{:?}", line);
}

#[test]
fn test_structural_errors_are_reported() {
    let renderer = TerminalRenderer::new(Vec::new(), false);
    assert!(matches!(
        renderer.write(&[0u8; 10]),
        Err(Error::Decode(DecodeError::TooShort { len: 10 }))
    ));
    assert!(matches!(
        renderer.write(&[0u8; 30]),
        Err(Error::Decode(DecodeError::BadMagic { found: 0 }))
    ));
    // Nothing partial reaches the destination.
    assert!(renderer.into_inner().is_empty());

    let renderer = LogfmtRenderer::new(Vec::new());
    assert!(renderer.write(&[0u8; 30]).is_err());
    assert!(renderer.into_inner().is_empty());
}

#[test]
fn test_custom_time_format() {
    let config = Config {
        time_format: "%Y".to_string(),
        utc: true,
        color: ColorMode::Always,
        ..Config::default()
    };
    let renderer = TerminalRenderer::from_config(&config, Vec::new());
    assert!(renderer.color());
    renderer.write(&encode(Level::Info, 1, b"x", &[])).unwrap();
    let line = String::from_utf8(renderer.into_inner()).unwrap();
    assert_eq!(line, "\x1b[32mINFO \x1b[0m[1970] x\n");
}

#[test]
fn test_invalid_time_format_falls_back_to_default() {
    init_tracing();
    let renderer = TerminalRenderer::new(Vec::new(), false)
        .with_time_format("%Q")
        .with_utc(true);
    assert_eq!(renderer.time_format(), ultralog::config::DEFAULT_TIME_FORMAT);

    renderer.write(&encode(Level::Info, 1, b"still rendered", &[])).unwrap();
    let line = String::from_utf8(renderer.into_inner()).unwrap();
    assert_eq!(line, "INFO [01-01|00:00:00] still rendered\n");

    let config = Config {
        time_format: "%H:%M %!".to_string(),
        ..Config::default()
    };
    let renderer = TerminalRenderer::from_config(&config, Vec::new());
    assert_eq!(renderer.time_format(), ultralog::config::DEFAULT_TIME_FORMAT);
}

#[test]
fn test_logfmt_levels_and_quoting() {
    let line = logfmt_line(&encode(Level::Error, 1, b"", &[Field::str("q", "a=b")]));
    assert_eq!(line, "time=1970-01-01T00:00:00Z level=error msg=\"\" q=\"a=b\"\n");

    let mut record = encode(Level::Info, 1, b"ok", &[]);
    record[5] = 200;
    let line = logfmt_line(&record);
    assert_eq!(line, "time=1970-01-01T00:00:00Z level=unknown msg=ok\n");
}

#[test]
fn test_logfmt_value_formats() {
    let record = encode(
        Level::Debug,
        1,
        b"m",
        &[
            Field::int("i", -5),
            Field::float64("f", 2.5),
            Field::float32("g", 0.25),
            Field::bool("b", false),
            Field::bytes("x", &[0x0f]),
        ],
    );
    let line = logfmt_line(&record);
    assert!(line.ends_with("msg=m i=-5 f=2.5 g=0.25 b=false x=0f\n"), "{:?}", line);
}
