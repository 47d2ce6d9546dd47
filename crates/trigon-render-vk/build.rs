use std::{env, fs, path::PathBuf};

const SHADERS: [&str; 2] = ["triangle.vert", "triangle.frag"];

fn main() {
    let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("manifest dir")).join("shaders");

    for name in SHADERS {
        println!("cargo:rerun-if-changed={}", dir.join(name).display());
        println!("cargo:rerun-if-changed={}", dir.join(format!("{name}.spv")).display());
    }

    #[cfg(feature = "shaderc")]
    compile(&dir, &out);

    #[cfg(not(feature = "shaderc"))]
    for name in SHADERS {
        let spv = format!("{name}.spv");
        fs::copy(dir.join(&spv), out.join(&spv))
            .unwrap_or_else(|e| panic!("copy {spv}: {e}"));
    }
}

#[cfg(feature = "shaderc")]
fn compile(dir: &std::path::Path, out: &std::path::Path) {
    let comp = shaderc::Compiler::new().expect("shaderc compiler");
    let mut opts = shaderc::CompileOptions::new().expect("shaderc options");
    opts.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_0 as u32,
    );
    opts.set_optimization_level(shaderc::OptimizationLevel::Performance);

    for (name, kind) in [
        ("triangle.vert", shaderc::ShaderKind::Vertex),
        ("triangle.frag", shaderc::ShaderKind::Fragment),
    ] {
        let src = fs::read_to_string(dir.join(name)).unwrap_or_else(|e| panic!("read {name}: {e}"));
        let spv = comp
            .compile_into_spirv(&src, kind, name, "main", Some(&opts))
            .unwrap_or_else(|e| panic!("compile {name}: {e}"));
        fs::write(out.join(format!("{name}.spv")), spv.as_binary_u8())
            .unwrap_or_else(|e| panic!("write {name}.spv: {e}"));
    }
}
