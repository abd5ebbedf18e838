use anyhow::{Context, Result};
use clap::Parser;
use heapscope::domain::{IdSize, ObjectId};
use heapscope::graph::HeapValue;
use heapscope::hprof::HprofWriter;
use heapscope_common::{BasicType, PrimitiveType};
use std::path::{Path, PathBuf};

const INT: BasicType = BasicType::Primitive(PrimitiveType::Int);
const LONG: BasicType = BasicType::Primitive(PrimitiveType::Long);

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Write a small heap dump for trying out the explorer
    DemoDump {
        /// Output file
        path: PathBuf,
        /// Identifier width in bytes (4 or 8)
        #[arg(long, default_value = "8")]
        id_size: u32,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::DemoDump { path, id_size } => demo_dump(&path, id_size)?,
    }

    Ok(())
}

fn demo_dump(path: &Path, id_size: u32) -> Result<()> {
    let Some(id_size) = IdSize::from_header(id_size) else {
        anyhow::bail!("Identifier size must be 4 or 8, got {id_size}");
    };

    let mut writer = HprofWriter::new(id_size);
    let object = writer.class("java.lang.Object", None, &[]);
    let string = writer.string_class(object);
    let object_array = writer.class("[Ljava/lang/Object;", Some(object), &[]);
    let base = writer.class("com.example.Resource", Some(object), &[("createdAt", LONG)]);
    let leak = writer.class(
        "com.example.Leak",
        Some(base),
        &[("name", BasicType::Object), ("next", BasicType::Object), ("size", INT)],
    );
    let holder = writer.class("com.example.LeakHolder", Some(object), &[("leaks", BasicType::Object)]);

    // A chain of leaks: foo -> bar -> (dangling), plus one without a name
    let foo_name = writer.java_string(string, "foo");
    let bar_name = writer.java_string(string, "bar");
    let dangling = ObjectId(0x00de_ad00);
    let bar = writer.instance(
        leak,
        &[
            HeapValue::Reference(Some(bar_name)),
            HeapValue::Reference(Some(dangling)),
            HeapValue::Int(2),
            HeapValue::Long(1_700_000_000_000),
        ],
    );
    let foo = writer.instance(
        leak,
        &[
            HeapValue::Reference(Some(foo_name)),
            HeapValue::Reference(Some(bar)),
            HeapValue::Int(1),
            HeapValue::Long(1_700_000_000_001),
        ],
    );
    let nameless = writer.instance(
        leak,
        &[HeapValue::Reference(None), HeapValue::Reference(None), HeapValue::Int(0), HeapValue::Long(0)],
    );
    writer.root_unknown(foo);

    writer.segment_break();
    let leaks = writer.object_array(object_array, &[Some(foo), Some(nameless), None]);
    writer.instance(holder, &[HeapValue::Reference(Some(leaks))]);
    writer.primitive_array(PrimitiveType::Int, &[0, 0, 0, 42]);

    writer.write_to(path).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✓ Demo heap dump written");
    println!("  Path: {}", path.display());
    println!("  Identifier size: {} bytes", id_size.bytes());
    println!("  Try: heapscope {} --search Leak --select 0 --select 0", path.display());

    Ok(())
}
