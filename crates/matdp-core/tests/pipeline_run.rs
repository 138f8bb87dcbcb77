use matdp_core::domain::{ErrorCategory, TechKey};
use matdp_core::pipeline::{PipelineReport, render_human_summary, run, run_with_config};
use matdp_core::sdf::{SdfLabels, SdfSources, StoredSource, create_sdf, load};
use matdp_core::PipelineConfig;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent directory should be created");
    }
    fs::write(path, contents).expect("fixture should be written");
}

fn plant(specific: &str) -> TechKey {
    TechKey::new("Power plant", specific)
}

#[test]
fn leaf_inherits_branch_data_and_scales_by_targets() {
    let temp = TempDir::new().expect("tempdir should be created");
    let root = temp.path();
    write_file(
        &root.join("A/intensities.csv"),
        "Category,Specific,Material Unit,Production Unit,steel\nPower plant,T1,t,MW,2\n",
    );
    write_file(&root.join("A/indicators.csv"), "Resource,CO2\nsteel,1\n");
    write_file(
        &root.join("A/B/targets.csv"),
        "Category,Specific,Value\nPower plant,T1,10\n",
    );

    let node = load(root).expect("SDF should load");
    let output = run(&node).expect("run should succeed");

    assert_eq!(output.len(), 1);
    assert_eq!(output.years().into_iter().collect::<Vec<_>>(), vec![0]);
    let result = output.get((0, "A/B")).expect("A/B should have a year 0 output");
    assert_eq!(result.required(0, 0), 20.0);
    assert_eq!(result.emission(0, 0, 0), 20.0);

    let resources = output.resources("A/B").expect("resources should be stacked");
    assert_eq!(resources.get(&(0, plant("T1")), "steel"), Some(20.0));
    let emissions = output.emissions("A/B", "CO2").expect("CO2 should be stacked");
    assert_eq!(emissions.get(&(0, plant("T1")), "steel"), Some(20.0));
    assert!(output.emissions("A/B", "Water").is_none());

    let info = output
        .tech_metadata()
        .get(&plant("T1"))
        .expect("T1 metadata should reach the output");
    assert_eq!(info.production_unit.as_deref(), Some("MW"));

    let summary = render_human_summary(&PipelineReport::from_output(&output));
    assert!(summary.contains("0 A/B: 1 technologies, 1 resources (CO2=20.0000)"));
}

#[test]
fn yearly_override_only_affects_its_subtree() {
    let temp = TempDir::new().expect("tempdir should be created");
    let root = temp.path();
    write_file(
        &root.join("intensities.csv"),
        "Category,Specific,steel\nPower plant,T1,1\n",
    );
    write_file(&root.join("indicators.csv"), "Resource,CO2\nsteel,0.5\n");
    write_file(
        &root.join("UK/intensities.csv"),
        "Category,Specific,steel\nPower plant,T1,1\n",
    );
    write_file(
        &root.join("UK/intensities_2030.csv"),
        "Category,Specific,steel\nPower plant,T1,3\n",
    );
    let targets = "Category,Specific,2025,2035\nPower plant,T1,10,10\n";
    write_file(&root.join("UK/targets.csv"), targets);
    write_file(&root.join("FR/targets.csv"), targets);

    let node = load(root).expect("SDF should load");
    let output = run_with_config(&node, &PipelineConfig::default().with_workers(2))
        .expect("run should succeed");

    let uk_years: Vec<_> = output.for_path("UK").iter().map(|result| result.year).collect();
    assert_eq!(uk_years, vec![2025, 2030, 2035]);
    let fr_years: Vec<_> = output.for_path("FR").iter().map(|result| result.year).collect();
    assert_eq!(fr_years, vec![2025, 2035]);

    let uk = |year: i32| output.get(("UK", year)).expect("UK output should exist").required(0, 0);
    assert_eq!(uk(2025), 10.0);
    assert_eq!(uk(2030), 30.0);
    assert_eq!(uk(2035), 30.0);
    let fr = output.get((2035, "FR")).expect("FR output should exist");
    assert_eq!(fr.required(0, 0), 10.0);
    assert_eq!(fr.emission(0, 0, 0), 5.0);

    let in_2035 = output.for_year(2035);
    assert_eq!(in_2035.len(), 2);
    assert_eq!(in_2035[0].path.to_string(), "FR");
}

#[test]
fn doubling_targets_doubles_outputs() {
    let run_with_target = |target: f64| {
        let temp = TempDir::new().expect("tempdir should be created");
        let root = temp.path();
        write_file(
            &root.join("intensities.csv"),
            "Category,Specific,steel,copper\nPower plant,T1,2,0.25\nPower plant,T2,1,4\n",
        );
        write_file(&root.join("indicators.csv"), "Resource,CO2,Water\nsteel,1,3\ncopper,2,\n");
        write_file(
            &root.join("UK/targets.csv"),
            &format!("Category,Specific,2030\nPower plant,T1,{target}\nPower plant,T2,1\n"),
        );
        let node = load(root).expect("SDF should load");
        run(&node).expect("run should succeed")
    };

    let single = run_with_target(5.0);
    let double = run_with_target(10.0);
    let left = single.get((2030, "UK")).expect("output should exist");
    let right = double.get((2030, "UK")).expect("output should exist");
    for resource in 0..2 {
        assert_eq!(right.required(0, resource), 2.0 * left.required(0, resource));
        assert_eq!(right.required(1, resource), left.required(1, resource));
        for indicator in 0..2 {
            assert_eq!(
                right.emission(indicator, 0, resource),
                2.0 * left.emission(indicator, 0, resource)
            );
        }
    }
}

#[test]
fn saved_tree_reruns_to_the_same_results() {
    let temp = TempDir::new().expect("tempdir should be created");
    let source = temp.path().join("source");
    write_file(
        &source.join("intensities.csv"),
        "Category,Specific,Description,Material Unit,Production Unit,steel\n\
         Power plant,T1,Coal,t,MW,2\n",
    );
    write_file(&source.join("indicators.csv"), "Resource,CO2\nsteel,1.5\n");
    write_file(&source.join("indicators_2040.csv"), "Resource,CO2\nsteel,0.5\n");
    write_file(
        &source.join("EU/UK/targets.csv"),
        "Category,Specific,2030,2050\nPower plant,T1,4,8\n",
    );

    let original = load(&source).expect("SDF should load");
    let copy_dir = temp.path().join("copy");
    original.save(&copy_dir).expect("SDF should save");
    let reloaded = load(&copy_dir).expect("saved SDF should load");
    assert_eq!(reloaded, original);

    let first = run(&original).expect("run should succeed");
    let second = run(&reloaded).expect("run should succeed");
    assert_eq!(first.len(), 3);
    for (left, right) in first.iter().zip(second.iter()) {
        assert_eq!((left.year, &left.path), (right.year, &right.path));
        assert_eq!(left.required_resources, right.required_resources);
        assert_eq!(left.emissions, right.emissions);
    }
    let in_2050 = first.get((2050, "EU/UK")).expect("2050 output should exist");
    assert_eq!(in_2050.emission(0, 0, 0), 8.0);
}

#[test]
fn conflicting_category_units_fail_the_run() {
    let temp = TempDir::new().expect("tempdir should be created");
    let root = temp.path();
    write_file(&root.join("indicators.csv"), "Resource,CO2\nsteel,1\n");
    write_file(
        &root.join("UK/intensities.csv"),
        "Category,Specific,Material Unit,steel\nPower plant,T1,t,1\n",
    );
    write_file(&root.join("UK/targets.csv"), "Category,Specific,Value\nPower plant,T1,1\n");
    write_file(
        &root.join("FR/intensities.csv"),
        "Category,Specific,Material Unit,steel\nPower plant,T2,kg,1\n",
    );
    write_file(&root.join("FR/targets.csv"), "Category,Specific,Value\nPower plant,T2,1\n");

    let node = load(root).expect("conflicting units only warn at load");
    let error = run(&node).expect_err("conflicting units should fail the run");
    assert_eq!(error.category(), ErrorCategory::Computation);
    assert_eq!(error.placeholder(), "RUN.TECH_MATERIAL_UNITS");
    assert_eq!(error.exit_code(), 4);
}

#[test]
fn indicator_names_must_match_down_a_branch() {
    let temp = TempDir::new().expect("tempdir should be created");
    let root = temp.path();
    write_file(
        &root.join("intensities.csv"),
        "Category,Specific,steel\nPower plant,T1,1\n",
    );
    write_file(&root.join("indicators.csv"), "Resource,CO2\nsteel,1\n");
    write_file(&root.join("UK/indicators.csv"), "Resource,CO2,Water\nsteel,1,2\n");
    write_file(&root.join("UK/targets.csv"), "Category,Specific,Value\nPower plant,T1,1\n");

    let node = load(root).expect("SDF should load");
    let error = run(&node).expect_err("indicator names should differ");
    assert_eq!(error.category(), ErrorCategory::InputValidation);
    assert_eq!(error.placeholder(), "INPUT.SDF_INDICATOR_NAMES");
    assert!(error.message().starts_with("UK"));
}

#[test]
fn stored_sources_build_a_runnable_tree() {
    let temp = TempDir::new().expect("tempdir should be created");
    let intensities_dir = temp.path().join("intensities");
    let indicators_dir = temp.path().join("indicators");
    let targets_dir = temp.path().join("targets");
    write_file(
        &intensities_dir.join("World/intensities.csv"),
        "Category,Specific,steel\nPower plant,T1,2\n",
    );
    write_file(&indicators_dir.join("World/indicators.csv"), "Resource,CO2\nsteel,1\n");
    write_file(
        &targets_dir.join("World/UK/targets.csv"),
        "Category,Specific,Value\nPower plant,T1,3\n",
    );

    let intensities = StoredSource::intensities(&intensities_dir).with_main_label("Region");
    let indicators = StoredSource::indicators(&indicators_dir);
    let targets = StoredSource::targets(&targets_dir).with_tail_labels(["Scenario"]);
    let node = create_sdf(
        &SdfSources {
            intensities: &intensities,
            indicators: &indicators,
            targets: vec![&targets],
        },
        &SdfLabels::default(),
    )
    .expect("SDF should be created");
    assert_eq!(node.metadata().main_label, "Region");
    assert_eq!(node.metadata().tail_labels, vec!["Scenario"]);

    let output = run(&node).expect("run should succeed");
    let result = output.get((0, "World/UK")).expect("World/UK output should exist");
    assert_eq!(result.required(0, 0), 6.0);
    assert_eq!(output.metadata().main_label, "Region");
}
