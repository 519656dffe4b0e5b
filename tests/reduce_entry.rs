use dojo_grader::{
    parser::Parser,
    typescript::{
        entry::{ExportForm, locate},
        reduce::{Pass, reduce},
        runtime::compile,
    },
};

fn entry_name(source: &str) -> Option<(String, ExportForm)> {
    let parser = Parser::typescript(source).expect("parses");
    locate(&parser).map(|e| (e.name, e.form))
}

#[test]
fn plain_javascript_is_untouched() {
    let source = "function add(a, b) {\n  return a + b;\n}\n";
    let reduction = reduce(source).expect("reduces");
    assert_eq!(reduction.code, source);
    assert!(reduction.is_unchanged());
}

#[test]
fn keeps_line_numbers() {
    let source = r#"import { helper } from "./helper";
interface Options {
    verbose?: boolean;
    depth: number;
}
export function walk<T>(items: T[], options: Options): T[] {
    const copy = items.slice() as T[];
    return copy!;
}
"#;
    let reduction = reduce(source).expect("reduces");
    assert_eq!(reduction.code.lines().count(), source.lines().count());
    assert_eq!(reduction.code.lines().nth(5).map(str::trim), Some("function walk(items, options) {"));
    assert_eq!(reduction.code.lines().nth(6).map(str::trim), Some("const copy = items.slice();"));
    assert_eq!(reduction.code.lines().nth(7).map(str::trim), Some("return copy;"));
    compile(&reduction.code).expect("reduced code compiles");
}

#[test]
fn reports_passes_in_order() {
    let source = r#"
import fs from "fs";
type Id = string;
export const find = <T,>(xs: T[], id: Id): T | undefined => xs.find((x: any) => x.id === id)!;
const n = <number>(1 as unknown);
"#;
    let reduction = reduce(source).expect("reduces");
    assert_eq!(
        reduction.steps,
        vec![
            Pass::TypeDeclarations,
            Pass::Imports,
            Pass::Exports,
            Pass::Generics,
            Pass::Annotations,
            Pass::Assertions,
            Pass::NonNull,
        ]
    );
    compile(&reduction.code).expect("reduced code compiles");
}

#[test]
fn strips_class_modifiers() {
    let source = r#"
interface Named { name: string }
export class Account implements Named {
    private readonly owner: string;
    public balance!: number;
    name = "account";
    constructor(owner: string) {
        this.owner = owner;
        this.balance = 0;
    }
    public deposit(amount: number): void {
        this.balance += amount;
    }
    overloaded(x: string): string;
    overloaded(x: any): any {
        return x;
    }
}
"#;
    let reduction = reduce(source).expect("reduces");
    let code = &reduction.code;
    assert!(!code.contains("implements"));
    assert!(!code.contains("private"));
    assert!(!code.contains("readonly"));
    assert!(!code.contains("balance!"));
    assert!(!code.contains("export"));
    assert!(!code.contains(": string"));
    assert!(code.contains("class Account"));
    compile(code).expect("reduced code compiles");
}

#[test]
fn drops_export_clauses_and_anonymous_defaults() {
    let source = "function a() {}\nexport { a };\nexport default 42;\n";
    let reduction = reduce(source).expect("reduces");
    assert_eq!(reduction.code, "function a() {}\n\n\n");
    assert_eq!(reduction.steps, vec![Pass::Exports]);
}

#[test]
fn exported_declarations_win() {
    let source = r#"
export const helper = () => 1;
export function main() { return helper(); }
"#;
    assert_eq!(entry_name(source), Some(("main".to_string(), ExportForm::Declaration)));
}

#[test]
fn default_function_exports_count_as_declarations() {
    let source = "export default function solve(n) { return n; }";
    assert_eq!(entry_name(source), Some(("solve".to_string(), ExportForm::Declaration)));
}

#[test]
fn exported_bindings_need_a_function_value() {
    let source = r#"
export const LIMIT = 10;
export let transform = function (x) { return x * LIMIT; };
"#;
    assert_eq!(entry_name(source), Some(("transform".to_string(), ExportForm::Binding)));
}

#[test]
fn export_clauses_must_name_top_level_functions() {
    let source = r#"
const data = [1, 2];
const total = (xs) => xs.length;
function unused() {}
export { data, total };
"#;
    assert_eq!(entry_name(source), Some(("total".to_string(), ExportForm::Clause)));
}

#[test]
fn nothing_exported_means_no_entry_point() {
    assert_eq!(entry_name("function main() {}"), None);
    assert_eq!(entry_name("export const VALUE = 3;"), None);
    assert_eq!(entry_name("export default () => 1;"), None);
}
