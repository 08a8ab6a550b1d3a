use sci_calc::{AngleMode, Config, Session};

struct Transcript {
    out: String,
    err: String,
    session: Session,
}

fn drive(config: Config, input: &str) -> Transcript {
    let mut session = Session::new(config);
    let (mut out, mut err) = (Vec::<u8>::new(), Vec::<u8>::new());
    session
        .run(input.as_bytes(), &mut out, &mut err)
        .expect("writing to memory never fails");
    Transcript {
        out: String::from_utf8(out).unwrap(),
        err: String::from_utf8(err).unwrap(),
        session,
    }
}

#[test]
fn evaluates_and_tracks_state() {
    let t = drive(
        Config::default(),
        "2 + 3\nmode deg\nsin(90)\nm+ 5\nM * 2\nh\nquit\n",
    );

    assert!(t.out.starts_with("Scientific Calculator - Type ? or help for help\n"));
    assert!(t.out.contains("> Result: 5\n"));
    assert!(t.out.contains("> Angle mode set to DEGREES\n"));
    assert!(t.out.contains("> Result: 1\n"));
    assert!(t.out.contains("> Memory slot added to: 5\n"));
    assert!(t.out.contains("> Result: 10\n"));
    assert!(t.out.contains("> 1: 2 + 3\n2: sin(90)\n3: M * 2\n"));
    assert!(t.out.ends_with("Goodbye!\n"));
    assert!(t.err.is_empty(), "unexpected diagnostics: {}", t.err);

    assert_eq!(t.session.angle_mode(), AngleMode::Degrees);
    assert_eq!(t.session.memory(), 5.0);
}

#[test]
fn errors_do_not_end_the_session() {
    let t = drive(Config::default(), "5 / 0\n2 # 3\n(1\n4 * 4\n");

    assert!(t.out.contains("Result: 16\n"));
    assert!(t.out.ends_with("Goodbye!\n"));
    assert!(t.err.contains("Invalid expression: 2 # 3"));

    // a line that fails to tokenize is not recorded
    let recorded: Vec<_> = t.session.history().iter().map(|(_, line)| line).collect();
    assert_eq!(recorded, ["5 / 0", "(1", "4 * 4"]);
}

#[test]
fn memory_commands() {
    let config = Config {
        memory: 10.0,
        ..Config::default()
    };
    let t = drive(config, "mr\nm- 2.5\nmr\nmc\nmr\nm+ abc\n");

    assert!(t.out.contains("Memory recall: 10\n"));
    assert!(t.out.contains("Memory slot subtracted from: 2.5\n"));
    assert!(t.out.contains("Memory recall: 7.5\n"));
    assert!(t.out.contains("Memory cleared\n"));
    assert!(t.out.contains("Memory recall: 0\n"));
    assert!(!t.err.is_empty());
    assert_eq!(t.session.memory(), 0.0);
}

#[test]
fn history_recall() {
    let t = drive(Config::default(), "3 * 4\n!!\n1 + 1\n!1\nh 2\n!9\n");

    assert_eq!(t.out.matches("Result: 12\n").count(), 3);
    assert!(t.out.contains("> 3 * 4\nResult: 12\n"));
    assert!(t.out.contains("> 3: 1 + 1\n4: 3 * 4\n"));
    assert_eq!(t.session.history().len(), 4);
    assert!(!t.err.is_empty());
}

#[test]
fn history_capacity_is_respected() {
    let config = Config {
        history_capacity: 2,
        ..Config::default()
    };
    let t = drive(config, "1\n2\n3\n!1\nh\n");

    assert!(t.out.contains("> 2: 2\n3: 3\n"));
    assert!(!t.err.is_empty());
}

#[test]
fn precision_and_help() {
    let config = Config {
        precision: 4,
        ..Config::default()
    };
    let t = drive(config, "?\npi\n");

    assert!(t.out.contains("Functions: sin cos tan"));
    assert!(t.out.contains("Result: 3.142\n"));
}

#[test]
fn end_of_input_says_goodbye() {
    let t = drive(Config::default(), "1 + 1");
    assert!(t.out.contains("Result: 2\n"));
    assert!(t.out.ends_with("Goodbye!\n"));
}
