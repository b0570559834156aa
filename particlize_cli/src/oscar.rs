use anyhow::{Context, Result};
use particlize::emission::EmissionBuffer;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes one OSCAR-like particle list per event for the hadronic
/// afterburner, named `particle_list_osc_<event>.dat`.
pub fn write_event_files(directory: &Path, buffer: &EmissionBuffer) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(directory)
        .with_context(|| format!("unable to create '{}'", directory.display()))?;

    let mut paths = Vec::with_capacity(buffer.events().len());

    for (event, particles) in buffer.events().iter().enumerate() {
        let path = directory.join(format!("particle_list_osc_{}.dat", event + 1));
        let mut writer = BufWriter::new(
            File::create(&path).with_context(|| format!("unable to write '{}'", path.display()))?,
        );

        writeln!(writer, "n pid px py pz E m x y z t")?;

        for (n, particle) in particles.iter().enumerate() {
            writeln!(
                writer,
                "{n} {} {:.16e} {:.16e} {:.16e} {:.16e} {:.16e} {:.16e} {:.16e} {:.16e} {:.16e}",
                particle.mc_id,
                particle.px,
                particle.py,
                particle.pz,
                particle.e,
                particle.mass,
                particle.x,
                particle.y,
                particle.z,
                particle.t,
            )?;
        }

        paths.push(path);
    }

    Ok(paths)
}
