use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const NOW: &str = "2026-01-01T00:00:00Z";
const NOW_MS: i64 = 1_767_225_600_000;

fn make_home() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

fn usage(app: &str, group: &str, label: &str, ago_ms: i64) -> Value {
    json!({
        "package_name": app,
        "group_name": group,
        "group_label": label,
        "access_time_ms": NOW_MS - ago_ms,
    })
}

fn grant(app: &str, record: Value) -> Value {
    json!({ "app_key": app, "usages": [record] })
}

fn write_snapshot(home: &Path) -> PathBuf {
    let camera = "android.permission-group.CAMERA";
    let location = "android.permission-group.LOCATION";
    let body = json!({
        "groups": [
            {
                "name": camera,
                "label": "Camera",
                "declaring_namespace": "android",
                "icon": "ic_camera",
                "permissions": ["android.permission.CAMERA"],
                "grants": [
                    grant("com.maps", usage("com.maps", camera, "Camera", 120_000)),
                    grant("com.chat", usage("com.chat", camera, "Camera", 30_000))
                ]
            },
            {
                "name": location,
                "label": "Location",
                "declaring_namespace": "android",
                "icon": "ic_location",
                "permissions": ["android.permission.ACCESS_FINE_LOCATION"],
                "grants": [
                    grant("com.maps", usage("com.maps", location, "Location", 3 * 3_600_000)),
                    grant("system.gps", usage("system.gps", location, "Location", 60_000))
                ]
            },
            {
                "name": "vendor.permission-group.SENSORS",
                "label": "Vendor sensors",
                "declaring_namespace": "vendor",
                "grants": []
            }
        ],
        "apps": [
            { "key": "com.maps", "label": "Maps" },
            { "key": "com.chat", "label": "Chat" },
            { "key": "system.gps", "label": "GPS service" }
        ],
        "launcher_packages": ["com.maps", "com.chat"]
    });
    let path = home.join("snapshot.json");
    fs::write(&path, serde_json::to_string_pretty(&body).expect("json")).expect("write snapshot");
    path
}

fn run(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_permusage"))
        .args(args)
        .env("HOME", home)
        .env_remove("PERMUSAGE_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("run permusage")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn view_help_lists_filter_options() {
    let output = Command::new(env!("CARGO_BIN_EXE_permusage"))
        .args(["view", "--help"])
        .output()
        .expect("run help");
    let text = stdout(&output);
    assert!(text.contains("--group"));
    assert!(text.contains("--time"));
    assert!(text.contains("--show-system"));
    assert!(text.contains("--state"));
}

#[test]
fn view_text_orders_apps_and_hints_at_system_apps() {
    let home = make_home();
    let snapshot = write_snapshot(home.path());
    let snapshot = snapshot.to_str().expect("utf8 path");

    let text = stdout(&run(home.path(), &["view", snapshot, "--now", NOW]));

    assert!(text.starts_with("Permission usage (All permissions / Any time)"));
    let maps = text.find("Maps (2 permissions)").expect("maps grouped");
    let chat = text.find("Chat").expect("chat row");
    assert!(maps < chat, "app with more groups comes first:\n{text}");
    assert!(text.contains("accessed Camera, 2m ago"));
    assert!(text.contains("accessed Location, 3h ago"));
    assert!(!text.contains("GPS service"));
    assert!(text.contains("System apps hidden"));
}

#[test]
fn view_filters_by_group_and_window() {
    let home = make_home();
    let snapshot = write_snapshot(home.path());
    let snapshot = snapshot.to_str().expect("utf8 path");

    let text = stdout(&run(
        home.path(),
        &["view", snapshot, "--now", NOW, "--group", "Location", "--time", "1h", "--show-system"],
    ));

    assert!(text.starts_with("Permission usage (Location / Last hour)"));
    assert!(text.contains("GPS service"));
    assert!(!text.contains("Maps"));
    assert!(!text.contains("Chat"));
    assert!(!text.contains("System apps hidden"));
}

#[test]
fn view_json_reports_entries_and_filters() {
    let home = make_home();
    let snapshot = write_snapshot(home.path());
    let snapshot = snapshot.to_str().expect("utf8 path");

    let out = stdout(&run(
        home.path(),
        &["view", snapshot, "--now", NOW, "--format", "json"],
    ));
    let doc: Value = serde_json::from_str(&out).expect("view json");

    assert_eq!(doc["filters"]["group"], "All permissions");
    assert_eq!(doc["has_system_apps"], true);
    let entries = doc["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["kind"], "grouped");
    assert_eq!(entries[0]["app_key"], "com.maps");
    assert_eq!(entries[1]["kind"], "single");
    assert_eq!(entries[1]["app_key"], "com.chat");
}

#[test]
fn view_rejects_unknown_group_label() {
    let home = make_home();
    let snapshot = write_snapshot(home.path());
    let snapshot = snapshot.to_str().expect("utf8 path");

    let output = run(home.path(), &["view", snapshot, "--now", NOW, "--group", "Sms"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown permission filter 'Sms'"));
    assert!(stderr.contains("Camera"));
}

#[test]
fn view_state_is_saved_and_restored() {
    let home = make_home();
    let snapshot = write_snapshot(home.path());
    let snapshot = snapshot.to_str().expect("utf8 path");
    let state = home.path().join("state").join("state.toml");
    let state = state.to_str().expect("utf8 path");

    stdout(&run(
        home.path(),
        &["view", snapshot, "--now", NOW, "--state", state, "--group", "Camera", "--time", "15m"],
    ));
    let saved = fs::read_to_string(state).expect("state written");
    assert!(saved.contains("Camera"));

    let text = stdout(&run(home.path(), &["view", snapshot, "--now", NOW, "--state", state]));
    assert!(text.starts_with("Permission usage (Camera / Last 15 minutes)"));
    assert!(text.contains("Chat"));
    assert!(!text.contains("Location"));
}

#[test]
fn hide_system_overrides_saved_state() {
    let home = make_home();
    let snapshot = write_snapshot(home.path());
    let snapshot = snapshot.to_str().expect("utf8 path");

    let shown = stdout(&run(
        home.path(),
        &["view", snapshot, "--now", NOW, "--remember", "--show-system"],
    ));
    assert!(shown.contains("GPS service"));
    let state = home.path().join(".config").join("permusage").join("state.toml");
    assert!(fs::read_to_string(&state).expect("state written").contains("show_system = true"));

    let restored = stdout(&run(home.path(), &["view", snapshot, "--now", NOW, "--remember"]));
    assert!(restored.contains("GPS service"));

    let hidden = stdout(&run(
        home.path(),
        &["view", snapshot, "--now", NOW, "--remember", "--hide-system"],
    ));
    assert!(!hidden.contains("GPS service"));
    assert!(hidden.contains("System apps hidden"));
    assert!(fs::read_to_string(&state).expect("state written").contains("show_system = false"));
}

#[test]
fn show_and_hide_system_conflict() {
    let home = make_home();
    let snapshot = write_snapshot(home.path());
    let snapshot = snapshot.to_str().expect("utf8 path");

    let output = run(
        home.path(),
        &["view", snapshot, "--show-system", "--hide-system"],
    );
    assert!(!output.status.success());
}

#[test]
fn configured_locale_orders_filters() {
    let home = make_home();
    let snapshot = write_snapshot(home.path());
    let snapshot = snapshot.to_str().expect("utf8 path");
    let config = home.path().join("fr.toml");
    fs::write(&config, "[display]\nlocale = \"fr\"\n").expect("write config");
    let config = config.to_str().expect("utf8 path");

    let text = stdout(&run(home.path(), &["--config", config, "filters", snapshot]));
    assert!(text.contains("[1] Camera"));

    let bad = home.path().join("bad.toml");
    fs::write(&bad, "[display]\nlocale = \"??\"\n").expect("write config");
    let output = run(
        home.path(),
        &["--config", bad.to_str().expect("utf8 path"), "filters", snapshot],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("locale"));
}

#[test]
fn view_target_preselects_group_by_permission() {
    let home = make_home();
    let snapshot = write_snapshot(home.path());
    let snapshot = snapshot.to_str().expect("utf8 path");

    let text = stdout(&run(
        home.path(),
        &["view", snapshot, "--now", NOW, "--target", "android.permission.ACCESS_FINE_LOCATION"],
    ));
    assert!(text.starts_with("Permission usage (Location / Any time)"));
}

#[test]
fn filters_lists_platform_groups_only() {
    let home = make_home();
    let snapshot = write_snapshot(home.path());
    let snapshot = snapshot.to_str().expect("utf8 path");

    let text = stdout(&run(home.path(), &["filters", snapshot]));
    assert!(text.contains("[0] All permissions"));
    assert!(text.contains("[1] Camera"));
    assert!(text.contains("[2] Location"));
    assert!(!text.contains("Vendor sensors"));
    assert!(text.contains("Last 15 minutes"));
}

#[test]
fn config_labels_flow_into_output() {
    let home = make_home();
    let snapshot = write_snapshot(home.path());
    let snapshot = snapshot.to_str().expect("utf8 path");
    let config_dir = home.path().join(".config").join("permusage");
    fs::create_dir_all(&config_dir).expect("config dir");
    fs::write(
        config_dir.join("permusage.toml"),
        "[display]\nany_group_label = \"Everything\"\nsummary_template = \"{group} used {time}\"\n",
    )
    .expect("write config");

    let text = stdout(&run(home.path(), &["view", snapshot, "--now", NOW]));
    assert!(text.starts_with("Permission usage (Everything / Any time)"));
    assert!(text.contains("Camera used 30s ago"));

    let shown = stdout(&run(home.path(), &["config"]));
    assert!(shown.contains("any_group_label = \"Everything\""));
}
