use anyhow::Context as _;
use anyhow::Result;
use medreader::convert::write_med_from_vtk;
use medreader::convert::WriteOptions;
use medreader::vtk::DataObject;
use medreader::MedReader;
use medreader::ReaderSettings;
use medreader::Registry;
use medreader::VoroGauss;
use std::io::Write as _;

const USAGE: &str = "Usage: vtk2med [options] [in.vtk [out.vtk]] <in.vtk >out.vtk";

fn main() -> Result<()> {
    let mut options = getopts::Options::new();
    options.optopt("s", "stamp", "time stamp of the converted fields (default: 0)", "TIME");
    options.optopt("t", "time", "requested time (default: the stamp)", "TIME");
    options.optopt("p", "policy", "time axis policy (default: 0)", "POLICY");
    options.optflag("m", "modal", "export every time step at once");
    options.optflag("V", "vectors", "add 3-component vectors of 2D and wide arrays");
    options.optopt(
        "g",
        "gauss-to-cell",
        "reduce Gauss point fields on cells, comma-separated list of avg, max, min",
        "LIST",
    );
    options.optflag("G", "voro-gauss", "split cells around their Gauss points");
    options.optflag("v", "verbose", "print the representation tree and selection graph");

    let matches = match medreader_tools::parse_args(options, USAGE, 2)? {
        Some(matches) => matches,
        None => return Ok(()),
    };

    medreader_tools::init_tracing();

    let stamp: f64 = matches
        .opt_get("s")
        .context("invalid value for option 'stamp'")?
        .unwrap_or(0.0);
    let time: f64 = matches
        .opt_get("t")
        .context("invalid value for option 'time'")?
        .unwrap_or(stamp);
    let time_policy: i32 = matches
        .opt_get("p")
        .context("invalid value for option 'policy'")?
        .unwrap_or(0);
    let gauss_to_cell = matches
        .opt_str("g")
        .map(|spec| medreader_tools::parse_reductions(&spec))
        .transpose()
        .context("invalid value for option 'gauss-to-cell'")?;
    if gauss_to_cell.is_some() && matches.opt_present("G") {
        anyhow::bail!("options 'gauss-to-cell' and 'voro-gauss' are exclusive");
    }

    let input = medreader_tools::reader(matches.free.first())?;
    let input = mesh_io::vtk::parse_legacy(input).context("failed to read vtk file")?;

    let options = WriteOptions {
        time: stamp,
        ..WriteOptions::default()
    };
    let doc = write_med_from_vtk(&input, &options).context("failed to convert to MED")?;
    eprintln!(" -> Meshes: {}", doc.meshes.len());
    eprintln!(" -> Fields: {}", doc.fields.len());

    let settings = ReaderSettings {
        time_policy,
        modal: matches.opt_present("m"),
        generate_vectors: matches.opt_present("V"),
    };
    let mut reader = MedReader::from_document(doc, settings).context("failed to load document")?;
    let information = reader.request_information()?;
    eprintln!(" -> Time steps: {:?}", information.steps);

    if matches.opt_present("v") {
        eprint!("{}", reader.tree().print_my_self());
        eprint!("{}", reader.sil()?);
    }

    let mut registry = Registry::default();
    let output = reader
        .request_data(time, &mut registry)
        .with_context(|| format!("failed to build the dataset at time {time}"))?;
    let dataset = match output.blocks.into_iter().next().flatten() {
        Some(DataObject::DataSet(dataset)) => dataset,
        _ => anyhow::bail!("the reader produced no dataset"),
    };

    let dataset = if let Some(filter) = gauss_to_cell {
        filter
            .run(&dataset.into(), &registry)
            .context("failed to reduce Gauss point fields")?
    } else if matches.opt_present("G") {
        VoroGauss::default()
            .run(&dataset.into(), &registry)
            .context("failed to split cells around Gauss points")?
            .into()
    } else {
        dataset
    };

    let mut output = medreader_tools::writer(matches.free.get(1))?;
    mesh_io::vtk::write_legacy(&dataset, "medreader", &mut output)
        .context("failed to write vtk file")?;
    output.flush()?;

    Ok(())
}
