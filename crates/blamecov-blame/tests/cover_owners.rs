//! Coverage-ordered ownership from a report directory through blame output.

use blamecov_blame::owners::{analyze_blame, strategy_for};
use blamecov_core::{build_line_range_filter, DiffRange, SortOrder};

const REPORT: &str = r##"<title>Coverage for pkg/util.py: 60%</title>
<p id="n1" class="pln"><a href="#n1">1</a></p>
<p id="n2" class="stm mis"><a href="#n2">2</a></p>
<p id="n3" class="stm par run hide_run"><a href="#n3">3</a></p>
<p id="n4" class="stm run hide_run"><a href="#n4">4</a></p>
<p id="n5" class="stm mis"><a href="#n5">5</a></p>
            <td class="text">
"##;

fn blame_line(uuid: &str, line: u32, author: &str) -> String {
    format!(
        "{uuid} {line} {line} 1\n\
         author {author}\n\
         author-mail <{author}@example.com>\n\
         author-time 1453922613\n\
         author-tz -0500\n\
         committer {author}\n\
         committer-mail <{author}@example.com>\n\
         committer-time 1453922613\n\
         committer-tz -0500\n\
         summary work\n\
         filename pkg/util.py\n\
         \tpass\n"
    )
}

#[test]
fn uncovered_lines_are_attributed_by_span() {
    let project = tempfile::tempdir().unwrap();
    let cover = project.path().join("cover");
    std::fs::create_dir_all(&cover).unwrap();
    std::fs::create_dir_all(project.path().join("pkg")).unwrap();
    std::fs::write(project.path().join("pkg/util.py"), "a\nb\nc\nd\ne\n").unwrap();
    std::fs::write(cover.join("pkg_util_py.html"), REPORT).unwrap();

    let strategy = strategy_for(SortOrder::Cover);
    let modules = strategy.collect_modules(&cover).unwrap();
    assert_eq!(modules.len(), 1);
    let target = &modules[0];
    assert!(target.path.ends_with("pkg/util.py"));
    assert_eq!(target.ranges, vec![DiffRange::new(2, 3), DiffRange::new(5, 5)]);
    assert_eq!(build_line_range_filter(&target.ranges), vec!["-L2,3", "-L5,5"]);

    let a = "6e3b3aec8a73da4129e83554ad5ac2f43d4ec775";
    let b = "65491efbd9ea0843c00cb50ff4c89211862924de";
    let blame = [
        blame_line(a, 2, "zed"),
        blame_line(a, 3, "zed"),
        blame_line(b, 5, "amy"),
    ]
    .concat();

    let owners = analyze_blame(strategy.as_ref(), target, &blame, 0, false).unwrap();
    assert_eq!(owners.authors, vec!["amy", "zed"]);
    let spans: Vec<Option<&str>> = owners.records.iter().map(|r| r.lines.as_deref()).collect();
    assert_eq!(spans, vec![Some("2-3"), Some("5")]);

    let json = serde_json::to_value(&owners).unwrap();
    assert_eq!(json["order"], "cover");
    assert_eq!(json["records"][0]["lines"], "2-3");
}
