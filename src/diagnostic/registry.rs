/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,  // brief description for listings
    pub long: &'static str,   // full explanation for `blockstep explain`
}

/// All stable blockstep error codes.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Program structure ───────────────────────────────────────────────────
    ErrorEntry {
        code: "BS-P001",
        short: "loop end without a loop start",
        long: r#"## BS-P001: loop end without a loop start

A `loopEnd` block appeared before any `loopStart` with the same label.

**Example:**

    [{"type":"command","name":"forward1"},
     {"type":"loopEnd","label":"A"}]

Add the matching `{"type":"loopStart","label":"A","iterations":2}` before
the loop body, or remove the stray end marker.
"#,
    },
    ErrorEntry {
        code: "BS-P002",
        short: "loop is never closed",
        long: r#"## BS-P002: loop is never closed

A `loopStart` block has no `loopEnd` with the same label after it.
Every loop needs exactly one start and one end marker, with the start
first.
"#,
    },
    ErrorEntry {
        code: "BS-P003",
        short: "overlapping loops",
        long: r#"## BS-P003: overlapping loops

Loops must nest: an inner loop has to close before its outer loop does.

**Example that triggers this:**

    loop A x2 {
      loop B x2 {
    } A
      } B

**Fix:** close `B` before `A`.
"#,
    },
    ErrorEntry {
        code: "BS-P004",
        short: "duplicate loop label",
        long: r#"## BS-P004: duplicate loop label

Two loops share a label. Labels identify a loop's start and end markers
and its remaining iteration count, so each loop needs its own.
"#,
    },
    ErrorEntry {
        code: "BS-P005",
        short: "invalid loop label",
        long: r#"## BS-P005: invalid loop label

Loop labels are runs of uppercase letters counted in base 26:
`A`..`Z`, then `AA`, `AB`, and so on. Lowercase letters, digits and the
empty label are rejected.
"#,
    },

    // ── Run ─────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "BS-R001",
        short: "unknown command",
        long: r#"## BS-R001: unknown command

The program reached a command that has no handler registered in any
namespace. The run halts with the program counter still on that block,
so nothing after it executes.

The movement handlers understand `forward<n>`, `backward<n>`,
`left<deg>` and `right<deg>`, where `deg` is a multiple of 45 below 360.
"#,
    },
    ErrorEntry {
        code: "BS-R002",
        short: "command handler failed",
        long: r#"## BS-R002: command handler failed

A handler registered for the current command reported a failure. When a
command has handlers in several namespaces they run concurrently and the
first failure is reported. The program counter stays on the failing
block.
"#,
    },
    ErrorEntry {
        code: "BS-R003",
        short: "run made no progress",
        long: r#"## BS-R003: run made no progress

The run reached a loop end whose loop has no remaining-iterations count,
so the counter could not move. This happens when a sequence is run
without first initiating it, which sets every loop's count from its
loop start. The run halts on the loop end.
"#,
    },

    // ── Configuration ───────────────────────────────────────────────────────
    ErrorEntry {
        code: "BS-C001",
        short: "file could not be read",
        long: r#"## BS-C001: file could not be read

The program or scene configuration file does not exist or is not
readable.
"#,
    },
    ErrorEntry {
        code: "BS-C002",
        short: "malformed JSON",
        long: r#"## BS-C002: malformed JSON

The program or scene configuration file is not valid JSON for its
format. A program is a JSON array of blocks:

    [{"type":"loopStart","label":"A","iterations":4},
     {"type":"command","name":"forward2"},
     {"type":"command","name":"right90"},
     {"type":"loopEnd","label":"A"}]

A scene configuration is an object with any of `width`, `height`,
`start`, `drawingEnabled` and `stepDelayMs`.
"#,
    },
    ErrorEntry {
        code: "BS-C003",
        short: "invalid scene bounds",
        long: r#"## BS-C003: invalid scene bounds

The scene must be at least one cell wide and one cell high.
"#,
    },
];

/// Look up an error entry by code (e.g. `"BS-R001"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code == code)
}
