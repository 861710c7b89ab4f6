/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,  // brief description for tooling
    pub long: &'static str,   // full explanation for --explain
}

/// All stable error codes reported by minmod.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Source loading ──────────────────────────────────────────────────────
    ErrorEntry {
        code: "MM-S001",
        short: "unexpected character",
        long: r#"## MM-S001: unexpected character

The scanner found text that is not part of the language. Programs are made
of instruction names (letters, digits and `_`), stack brackets `[` and `]`,
runs of dots for indirection, `--` line comments and `<path>` imports.

**Example:**

    [A B]. $X

The `$` is not valid. Remove it or make it part of a name such as `_X`.
"#,
    },
    ErrorEntry {
        code: "MM-S002",
        short: "unclosed import",
        long: r#"## MM-S002: unclosed import

An import starts with `<` and must be closed with `>` on the same line.

**Example that triggers this:**

    <./lib.(m)m
    MAIN

**Fix:**

    <./lib.(m)m>
    MAIN
"#,
    },
    ErrorEntry {
        code: "MM-S003",
        short: "missing file extension",
        long: r#"## MM-S003: missing file extension

Source files, including imported ones, must carry the language's file
extension (`.(m)m` by default). A path with no extension is rejected
before anything is read.
"#,
    },
    ErrorEntry {
        code: "MM-S004",
        short: "wrong file extension",
        long: r#"## MM-S004: wrong file extension

The file exists but its extension is not the one the language expects.
Rename it, for example `prog.txt` to `prog.(m)m`.
"#,
    },
    ErrorEntry {
        code: "MM-S005",
        short: "cannot read file",
        long: r#"## MM-S005: cannot read file

The operating system refused to open or read the file. Check that the
path exists and is readable.
"#,
    },
    ErrorEntry {
        code: "MM-S006",
        short: "unresolved import",
        long: r#"## MM-S006: unresolved import

An import names a file that does not exist, or climbs more parent
directories than the importing file has.

A leading run of dots counts levels starting at the importing file:
`<./x.(m)m>` is a sibling, `<../x.(m)m>` lives one directory up. Paths
without leading dots are used as written.
"#,
    },
    ErrorEntry {
        code: "MM-S007",
        short: "unbalanced brackets",
        long: r#"## MM-S007: unbalanced brackets

Every file must close each stack it opens, and may not close a stack it
did not open. Imports do not change this: a stack cannot start in one file
and end in a file it imports.

**Example that triggers this:**

    -- main.(m)m
    [A <./rest.(m)m>

    -- rest.(m)m
    B ]

**Fix:** keep both brackets in one file.

    [A B]
"#,
    },
    // ── Program building ────────────────────────────────────────────────────
    ErrorEntry {
        code: "MM-P001",
        short: "unexpected ']'",
        long: r#"## MM-P001: unexpected ']'

A stack closer appeared with no open stack to close.

**Example:**

    A B] C

Remove the `]` or add the matching `[`.
"#,
    },
    ErrorEntry {
        code: "MM-P002",
        short: "unclosed stack",
        long: r#"## MM-P002: unclosed stack

The input ended while a stack opened with `[` was still open. The error
points at the opener that was never closed.
"#,
    },
    ErrorEntry {
        code: "MM-P003",
        short: "dangling indirection",
        long: r#"## MM-P003: dangling indirection

Dots raise the indirection level of the element right before them, so
they must follow an instruction name or a closing `]`.

**Example that triggers this:**

    . A

**Fix:**

    A.
"#,
    },
    ErrorEntry {
        code: "MM-P004",
        short: "unexpanded import",
        long: r#"## MM-P004: unexpanded import

An import reached the program builder without being replaced by the
imported file's contents. Load programs through the file loader, which
expands imports.
"#,
    },
    ErrorEntry {
        code: "MM-P005",
        short: "instruction registration failed",
        long: r#"## MM-P005: instruction registration failed

An instruction name could not be registered, or was used before it was
registered. This indicates a bug in the program builder.
"#,
    },
    ErrorEntry {
        code: "MM-P006",
        short: "stacks nested too deeply",
        long: r#"## MM-P006: stacks nested too deeply

Stack literals may nest at most 512 levels deep. The error points at the
opener that goes past the limit.
"#,
    },
    // ── Execution ───────────────────────────────────────────────────────────
    ErrorEntry {
        code: "MM-R001",
        short: "data stack underflow",
        long: r#"## MM-R001: data stack underflow

A built-in needs more arguments than the data stack holds. `SET` takes
two, `UNWRAP` one, `IF` one (two when the condition is empty).

**Example:**

    X. SET

`SET` needs a value below the target:

    [A]. X. SET
"#,
    },
    ErrorEntry {
        code: "MM-R002",
        short: "SET target is not an instruction",
        long: r#"## MM-R002: SET target is not an instruction

The top of the data stack must name the instruction being defined.

**Example that triggers this:**

    [A]. [B]. SET
"#,
    },
    ErrorEntry {
        code: "MM-R003",
        short: "SET target has indirection",
        long: r#"## MM-R003: SET target has indirection

The instruction named by `SET` must reach the data stack with no
indirection left. `X..` pushes `X.`, which cannot be a target.
"#,
    },
    ErrorEntry {
        code: "MM-R004",
        short: "SET target is a built-in",
        long: r#"## MM-R004: SET target is a built-in

Built-ins themselves cannot be redefined.
"#,
    },
    ErrorEntry {
        code: "MM-R005",
        short: "built-in used as an argument",
        long: r#"## MM-R005: built-in used as an argument

`SET`, `UNWRAP` and `IF` read the stack an argument denotes. A built-in
has no such stack.
"#,
    },
    ErrorEntry {
        code: "MM-R006",
        short: "uninitialized instruction",
        long: r#"## MM-R006: uninitialized instruction

An instruction was executed before any value was `SET` for it.

**Example:**

    X

**Fix:**

    [A.]. X. SET
    X
"#,
    },
    ErrorEntry {
        code: "MM-R007",
        short: "uninitialized argument",
        long: r#"## MM-R007: uninitialized argument

A built-in was given an instruction that has no value yet.

**Example:**

    Y. X. SET
"#,
    },
    ErrorEntry {
        code: "MM-R008",
        short: "malformed instruction stack",
        long: r#"## MM-R008: malformed instruction stack

The top of the instruction stack must be a sub-stack (a frame). This
happens when a program `SET`s `IS` to a value whose top is an instruction,
or when a stack reference is executed: it is pushed as it is, and the next
step finds a reference instead of a frame.

**Example that triggers this:**

    [A.]. UNWRAP DS. X. SET X
"#,
    },
    ErrorEntry {
        code: "MM-R009",
        short: "unknown instruction id",
        long: r#"## MM-R009: unknown instruction id

An element refers to an instruction that is not in the registry. This
indicates a bug in the interpreter.
"#,
    },
    ErrorEntry {
        code: "MM-R010",
        short: "missing reserved stack",
        long: r#"## MM-R010: missing reserved stack

The instruction or data stack was not registered before execution
started. This indicates a bug in the program builder.
"#,
    },
];

/// Look up an error entry by code (e.g. `"MM-R006"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code == code)
}
