use dojo_grader::typescript::runtime::{Limits, Realm, Value, compile, normalize_output};

const LIMITS: Limits = Limits {
    max_operations: 1_000_000,
    max_call_depth: 64,
    max_allocation: 1 << 20,
};

fn run(source: &str, entry: &str, args: Vec<Value>) -> String {
    let script = compile(source).expect("compiles");
    let mut realm = Realm::new(LIMITS);
    realm.evaluate(&script).expect("top level runs");
    let value = realm.invoke(entry, args).expect("call succeeds");
    normalize_output(&value).expect("normalizes")
}

fn run_err(source: &str, entry: &str) -> String {
    let script = compile(source).expect("compiles");
    let mut realm = Realm::new(LIMITS);
    realm
        .evaluate(&script)
        .and_then(|()| realm.invoke(entry, Vec::new()))
        .expect_err("call throws")
        .message()
}

#[test]
fn closures_keep_their_own_state() {
    let source = r#"
function counter(start) {
    let count = start;
    return () => ++count;
}
function main() {
    const a = counter(0);
    const b = counter(10);
    a(); a();
    return [a(), b()];
}
"#;
    assert_eq!(run(source, "main", vec![]), "[3,11]");
}

#[test]
fn loop_closures_capture_each_iteration() {
    let source = r#"
function main() {
    const fns = [];
    for (let i = 0; i < 3; i++) {
        fns.push(() => i);
    }
    return fns.map((f) => f()).join("");
}
"#;
    assert_eq!(run(source, "main", vec![]), "012");
}

#[test]
fn destructures_with_defaults_and_rest() {
    let source = r#"
function main({ name, tags: [first, ...others] = [], level = 1 }) {
    return `${name}/${first}/${others.length}/${level}`;
}
"#;
    let arg = Value::from_json(&serde_json::json!({ "name": "ada", "tags": ["x", "y", "z"] }));
    assert_eq!(run(source, "main", vec![arg]), "ada/x/2/1");
}

#[test]
fn classes_support_inheritance_and_statics() {
    let source = r#"
class Shape {
    static count = 0;
    constructor(name) {
        this.name = name;
        Shape.count++;
    }
    describe() {
        return `${this.name} with area ${this.area()}`;
    }
}
class Square extends Shape {
    side = 0;
    constructor(side) {
        super("square");
        this.side = side;
    }
    area() {
        return this.side * this.side;
    }
    static unit() {
        return new Square(1);
    }
}
function main() {
    const s = new Square(3);
    const u = Square.unit();
    return [s.describe(), u.area(), Shape.count, s instanceof Shape];
}
"#;
    assert_eq!(run(source, "main", vec![]), r#"["square with area 9",1,2,true]"#);
}

#[test]
fn array_and_string_methods() {
    let source = r#"
function main(words) {
    const lengths = words.map((w) => w.length).filter((n) => n > 2);
    const total = lengths.reduce((a, b) => a + b, 0);
    const sorted = [...words].sort((a, b) => a.localeCompare(b));
    return {
        total,
        sorted,
        upper: words[0].toUpperCase().padStart(6, "*"),
        parts: "a-b-c".split("-").reverse().join("+"),
        found: words.findIndex((w) => w.startsWith("c")),
    };
}
"#;
    let words = Value::from_json(&serde_json::json!(["pear", "fig", "cherry", "ox"]));
    assert_eq!(
        run(source, "main", vec![words]),
        r#"{"total":13,"sorted":["cherry","fig","ox","pear"],"upper":"**PEAR","parts":"c+b+a","found":2}"#
    );
}

#[test]
fn numeric_sort_without_comparator_is_lexicographic() {
    let source = "function main() { return [10, 9, 1, 100].sort(); }";
    assert_eq!(run(source, "main", vec![]), "[1,10,100,9]");
}

#[test]
fn try_catch_finally_ordering() {
    let source = r#"
function main() {
    const log = [];
    try {
        log.push("try");
        throw new TypeError("bad");
    } catch (e) {
        log.push(`${e.name}:${e.message}`);
    } finally {
        log.push("finally");
    }
    return log.join(",");
}
"#;
    assert_eq!(run(source, "main", vec![]), "try,TypeError:bad,finally");
}

#[test]
fn maps_and_sets() {
    let source = r#"
function main() {
    const counts = new Map();
    for (const ch of "banana") {
        counts.set(ch, (counts.get(ch) ?? 0) + 1);
    }
    const unique = new Set([3, 1, 3, 2, 1]);
    return [[...counts.entries()], [...unique], counts.size, unique.has(2)];
}
"#;
    assert_eq!(
        run(source, "main", vec![]),
        r#"[[["b",1],["a",3],["n",2]],[3,1,2],3,true]"#
    );
}

#[test]
fn optional_chaining_and_nullish() {
    let source = r#"
function main() {
    const user = { profile: null, settings: { theme: "dark" } };
    return [
        user.profile?.name ?? "anonymous",
        user.settings?.theme,
        user.missing?.deep.deeper,
        0 || "fallback",
        0 ?? "kept",
    ];
}
"#;
    assert_eq!(run(source, "main", vec![]), r#"["anonymous","dark",null,"fallback",0]"#);
}

#[test]
fn switch_falls_through_and_labels_break() {
    let source = r#"
function grade(score) {
    switch (true) {
        case score >= 90:
            return "A";
        case score >= 80:
        case score >= 75:
            return "B";
        default:
            return "C";
    }
}
function main() {
    let found = null;
    outer: for (let i = 0; i < 5; i++) {
        for (let j = 0; j < 5; j++) {
            if (i * j === 6) {
                found = `${i},${j}`;
                break outer;
            }
        }
    }
    return [grade(95), grade(77), grade(10), found];
}
"#;
    assert_eq!(run(source, "main", vec![]), r#"["A","B","C","2,3"]"#);
}

#[test]
fn regex_replace_and_test() {
    let source = r#"
function main(text) {
    const cleaned = text.replace(/[^a-z]/gi, "").toLowerCase();
    return [cleaned, /^[a-z]+$/.test(cleaned), cleaned === cleaned.split("").reverse().join("")];
}
"#;
    assert_eq!(
        run(source, "main", vec![Value::from("A man, a plan!")]),
        r#"["amanaplan",true,false]"#
    );
}

#[test]
fn number_formatting() {
    let source = r#"
function main() {
    return [(1234.5).toFixed(2), (0.1 + 0.2).toFixed(1), String(1e21), (255).toString(16), parseInt("42px"), Number("x")];
}
"#;
    assert_eq!(run(source, "main", vec![]), r#"["1234.50","0.3","1e+21","ff",42,null]"#);
}

#[test]
fn json_round_trip() {
    let source = r#"
function main() {
    const data = JSON.parse('{"b": [1, 2], "a": {"c": true}}');
    data.a.d = "new";
    return JSON.stringify(data, null, 2);
}
"#;
    assert_eq!(
        run(source, "main", vec![]),
        "{\n  \"b\": [\n    1,\n    2\n  ],\n  \"a\": {\n    \"c\": true,\n    \"d\": \"new\"\n  }\n}"
    );
}

#[test]
fn enums_map_both_ways() {
    let source = r#"
enum Direction { Up, Down = 5, Left }
function main() {
    return [Direction.Up, Direction.Left, Direction[5]];
}
"#;
    assert_eq!(run(source, "main", vec![]), r#"[0,6,"Down"]"#);
}

#[test]
fn undefined_and_null_normalize_by_name() {
    assert_eq!(run("function main() {}", "main", vec![]), "undefined");
    assert_eq!(run("function main() { return null; }", "main", vec![]), "null");
}

#[test]
fn unknown_names_throw_reference_errors() {
    assert_eq!(run_err("function main() { return missing + 1; }", "main"), "missing is not defined");
}

#[test]
fn assigning_to_const_throws() {
    let message = run_err("function main() { const x = 1; x = 2; return x; }", "main");
    assert_eq!(message, "Assignment to constant variable.");
}

#[test]
fn cyclic_values_cannot_be_stringified() {
    let source = "function main() { const a = {}; a.self = a; return JSON.stringify(a); }";
    assert_eq!(run_err(source, "main"), "Converting circular structure to JSON");
}

#[test]
fn call_depth_is_bounded() {
    let source = "function main() { return main(); }";
    assert_eq!(run_err(source, "main"), "Maximum call stack size exceeded");
}

#[test]
fn operation_budget_halts() {
    let script = compile("function main() { let i = 0; while (true) { i++; } }").expect("compiles");
    let mut realm = Realm::new(Limits {
        max_operations: 1_000,
        max_call_depth: 16,
        max_allocation: 1 << 20,
    });
    realm.evaluate(&script).expect("top level runs");
    let err = realm.invoke("main", Vec::new()).expect_err("halts");
    assert_eq!(err.message(), "Execution limit of 1000 operations exceeded (possible infinite loop)");
    assert!(realm.operations() > 1_000);
}

#[test]
fn random_is_seeded_per_realm() {
    let source = "function main() { return [Math.random(), Math.random()]; }";
    let first = run(source, "main", vec![]);
    assert_eq!(first, run(source, "main", vec![]));
    assert_ne!(first, "[0,0]");
}

#[test]
fn globals_are_visible_after_evaluation() {
    let script = compile("const answer = 6 * 7;").expect("compiles");
    let mut realm = Realm::new(LIMITS);
    realm.evaluate(&script).expect("runs");
    assert!(matches!(realm.global("answer"), Some(Value::Number(n)) if n == 42.0));
    assert!(realm.global("nothing").is_none());
}

#[test]
fn syntax_errors_carry_a_position() {
    let err = compile("function main() {\n  return 1 +;\n}").expect_err("does not compile");
    assert_eq!(err.line, 2);
}

#[test]
fn class_accessors_run_on_instances() {
    let source = r#"
class Temperature {
    constructor(celsius) {
        this.celsius = celsius;
    }
    get fahrenheit() {
        return this.celsius * 9 / 5 + 32;
    }
    set fahrenheit(value) {
        this.celsius = (value - 32) * 5 / 9;
    }
    get kelvin() {
        return this.celsius + 273;
    }
}
class Reading extends Temperature {}
function main() {
    const reading = new Reading(100);
    const before = reading.fahrenheit;
    reading.fahrenheit = 32;
    let error = "";
    try {
        reading.kelvin = 0;
    } catch (e) {
        error = e.name;
    }
    return [before, reading.celsius, reading.kelvin, error, Object.keys(reading)];
}
"#;
    assert_eq!(run(source, "main", vec![]), r#"[212,0,273,"TypeError",["celsius"]]"#);
}

#[test]
fn strings_count_code_points_and_date_is_absent() {
    let source = r#"function main() { return ["😀".length, "héllo".length, typeof Date]; }"#;
    assert_eq!(run(source, "main", vec![]), r#"[1,5,"undefined"]"#);
}

#[test]
fn deeply_nested_source_does_not_compile() {
    let source = format!("function main() {{ return {}1{}; }}", "[".repeat(1_000), "]".repeat(1_000));
    let err = compile(&source).expect_err("nesting is bounded");
    assert_eq!(err.message, "Expression nesting too deep");
}

#[test]
fn oversized_values_throw_range_errors() {
    assert_eq!(
        run_err("function main() { return 'ab'.repeat(1e12); }", "main"),
        "Invalid string length"
    );
    assert_eq!(
        run_err("function main() { const a = []; a[4000000000] = 1; return a; }", "main"),
        "Invalid array length"
    );
}

#[test]
fn deeply_nested_values_cannot_be_stringified() {
    let source = r#"
function main() {
    let nested = [];
    for (let i = 0; i < 2000; i++) {
        nested = [nested];
    }
    return nested;
}
"#;
    let script = compile(source).expect("compiles");
    let mut realm = Realm::new(LIMITS);
    realm.evaluate(&script).expect("top level runs");
    let value = realm.invoke("main", Vec::new()).expect("call succeeds");
    let err = normalize_output(&value).expect_err("too deep");
    assert_eq!(err.message(), "Maximum call stack size exceeded");
}
