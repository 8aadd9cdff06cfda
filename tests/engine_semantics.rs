use conform::{literal, Engine, ErrorKind, Evaluator, Outcome, Value};

fn eval(engine: &mut Engine, source: &str) -> Result<String, String> {
    match engine.evaluate(source) {
        Outcome::Completed(value) => Ok(literal(&value)),
        Outcome::Threw(thrown) => Err(literal(&thrown)),
    }
}

fn thrown_kind(engine: &mut Engine, source: &str) -> Option<ErrorKind> {
    match engine.evaluate(source) {
        Outcome::Threw(Value::Object(object)) => object.error_kind(),
        _ => None,
    }
}

#[test]
fn try_catch_finally_flow() {
    let mut engine = Engine::new();
    let cases = [
        ("var c=1; try{       } catch(e){c=2}              c", Ok("1")),
        ("var c=1; try{throw 0} catch(e){c=2}              c", Ok("2")),
        ("var c=1; try{       }               finally{c=3} c", Ok("3")),
        ("var c=1; try{throw 0}               finally{c=3} c", Err("0")),
        ("var c=1; try{       } catch(e){c=2} finally{c=3} c", Ok("3")),
        ("var c=1; try{throw 0} catch(e){c=2} finally{c=3} c", Ok("3")),
        ("var c=1; try{throw 0} catch(e){c=e}              c", Ok("0")),
    ];
    for (source, expected) in cases {
        let expected = expected.map(str::to_string).map_err(str::to_string);
        assert_eq!(eval(&mut engine, source), expected, "{source}");
    }
}

#[test]
fn catch_parameter_does_not_leak() {
    let mut engine = Engine::new();
    for source in [
        "var e=4,c=1; try{       } catch(e){c=e}              e",
        "var e=4,c=1; try{throw 0} catch(e){c=e}              e",
        "var e=4,c=1; try{throw 0} catch(e){c=e} finally{c=3} e",
    ] {
        assert_eq!(eval(&mut engine, source), Ok("4".to_string()), "{source}");
    }
    assert_eq!(
        thrown_kind(&mut engine, "try { throw 1 } catch (fresh) {} fresh"),
        Some(ErrorKind::ReferenceError)
    );
}

#[test]
fn var_named_like_the_catch_parameter_declares_a_global() {
    let mut engine = Engine::new();
    assert_eq!(
        eval(&mut engine, "try { throw 1 } catch (shadow) { var shadow = 2; shadow }"),
        Ok("2".to_string())
    );
    assert_eq!(eval(&mut engine, "shadow"), Ok("undefined".to_string()));
}

#[test]
fn finally_throw_replaces_catch_throw() {
    let mut engine = Engine::new();
    assert_eq!(
        eval(&mut engine, "try { throw 0 } catch (e) { throw 2 } finally { throw 3 }"),
        Err("3".to_string())
    );
    assert_eq!(
        eval(&mut engine, "try { throw 0 } catch (e) { throw 2 }"),
        Err("2".to_string())
    );
}

#[test]
fn error_objects_render_name_and_message() {
    let mut engine = Engine::new();
    assert_eq!(
        eval(&mut engine, "new TypeError('bad thing')"),
        Ok("TypeError: bad thing".to_string())
    );
    assert_eq!(
        eval(&mut engine, "var err = new Error('m'); err.name = 'Custom'; String(err)"),
        Ok(r#""Custom: m""#.to_string())
    );
    assert_eq!(eval(&mut engine, "URIError"), Ok("function URIError() { [native code] }".to_string()));
    assert_eq!(
        eval(&mut engine, "nope"),
        Err("ReferenceError: nope is not defined".to_string())
    );
}

#[test]
fn operators() {
    let mut engine = Engine::new();
    let cases = [
        ("1 + 2 * 3", "7"),
        ("(1 + 2) * 3", "9"),
        ("'1' + 2", r#""12""#),
        ("'3' * '4'", "12"),
        ("-7 % 3", "-1"),
        ("1 / 0", "Infinity"),
        ("1e21", "1e+21"),
        ("0.1 + 0.2", "0.30000000000000004"),
        ("null == undefined", "true"),
        ("null === undefined", "false"),
        ("'10' == 10", "true"),
        ("NaN != NaN", "true"),
        ("'a' < 'b' && 2 >= 2", "true"),
        ("0 || 'fallback'", r#""fallback""#),
        ("1 && 0", "0"),
        ("!''", "true"),
        ("typeof null", r#""object""#),
        ("typeof isNaN", r#""function""#),
        ("true ? 'y' : 'n'", r#""y""#),
        ("x = 1, x + 1", "2"),
        ("'abc'.length", "3"),
        ("({a: {b: 2}}).a.b", "2"),
        ("var o = {}; o['k'] = 5; o.k", "5"),
        ("var n = 5; n -= 2; n *= 3", "9"),
        ("var m = 1; --m", "0"),
        ("0x10", "16"),
        ("'\\u0041\\x42'", r#""AB""#),
        ("Boolean('')", "false"),
        ("{}", "undefined"),
        ("", "undefined"),
    ];
    for (source, expected) in cases {
        assert_eq!(eval(&mut engine, source), Ok(expected.to_string()), "{source}");
    }
}

#[test]
fn runtime_error_kinds() {
    let mut engine = Engine::new();
    assert_eq!(thrown_kind(&mut engine, "undefinedThing"), Some(ErrorKind::ReferenceError));
    assert_eq!(thrown_kind(&mut engine, "'a'++"), Some(ErrorKind::ReferenceError));
    assert_eq!(thrown_kind(&mut engine, "undefined.x"), Some(ErrorKind::TypeError));
    assert_eq!(thrown_kind(&mut engine, "undefined.x = 1"), Some(ErrorKind::TypeError));
    assert_eq!(thrown_kind(&mut engine, "isNaN.x()"), Some(ErrorKind::TypeError));
    assert_eq!(thrown_kind(&mut engine, "new isNaN()"), Some(ErrorKind::TypeError));
    assert_eq!(thrown_kind(&mut engine, "var const = 1"), Some(ErrorKind::SyntaxError));
    assert_eq!(thrown_kind(&mut engine, "a b"), Some(ErrorKind::SyntaxError));
}

#[test]
fn self_referential_error_cannot_be_printed() {
    let mut engine = Engine::new();
    assert_eq!(
        eval(&mut engine, "var loop = new Error(); loop.message = loop; loop"),
        Ok("<cannot represent object value as string>".to_string())
    );
    assert_eq!(thrown_kind(&mut engine, "String(loop)"), Some(ErrorKind::RangeError));
}
