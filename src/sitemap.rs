use chrono::{DateTime, Local};
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SITEMAP_XMLNS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Build-output directories that must never appear in the sitemap.
const EXCLUDED_DIRS: &[&str] = &["site_libs", "output", "renv"];

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// One page discovered in the site tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub loc: String,
    pub lastmod: String,
    pub priority: &'static str,
    pub changefreq: &'static str,
}

/// Crawl `root` for `.html` files and turn each into a sitemap entry.
/// Hidden directories and the usual build-output directories are skipped.
/// `index.html` becomes the clean directory URL.
pub fn collect_pages(root: &Path, base_url: &str) -> Result<Vec<PageEntry>, SitemapError> {
    let base = base_url.trim_end_matches('/');
    let mut pages = Vec::new();
    walk(root, root, base, &mut pages)?;
    pages.sort_by(|a, b| a.loc.cmp(&b.loc));
    Ok(pages)
}

fn walk(
    dir: &Path,
    root: &Path,
    base: &str,
    pages: &mut Vec<PageEntry>,
) -> Result<(), SitemapError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    for path in entries {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            if EXCLUDED_DIRS.contains(&name) {
                continue;
            }
            walk(&path, root, base, pages)?;
        } else if name.ends_with(".html") {
            pages.push(page_entry(&path, root, base)?);
        }
    }
    Ok(())
}

fn page_entry(path: &Path, root: &Path, base: &str) -> Result<PageEntry, SitemapError> {
    let rel = path
        .strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");

    let mut rel = rel;
    if rel.ends_with("index.html") {
        rel.truncate(rel.len() - "index.html".len());
    }
    let loc = format!("{}/{}", base, rel);

    let modified = fs::metadata(path)?.modified()?;
    let lastmod = DateTime::<Local>::from(modified).format("%Y-%m-%d").to_string();

    let is_root = loc == format!("{}/", base);
    Ok(PageEntry {
        loc,
        lastmod,
        priority: if is_root { "1.0" } else { "0.8" },
        changefreq: if is_root { "monthly" } else { "yearly" },
    })
}

/// Write the entries as a sitemap.xml document.
pub fn write_sitemap(pages: &[PageEntry], path: &Path) -> Result<(), SitemapError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    writer
        .create_element("urlset")
        .with_attribute(("xmlns", SITEMAP_XMLNS))
        .write_inner_content(|w: &mut Writer<Vec<u8>>| -> Result<(), std::io::Error> {
            for page in pages {
                w.create_element("url").write_inner_content(|w| -> Result<(), std::io::Error> {
                    w.create_element("loc")
                        .write_text_content(BytesText::new(&page.loc))?;
                    w.create_element("lastmod")
                        .write_text_content(BytesText::new(&page.lastmod))?;
                    w.create_element("priority")
                        .write_text_content(BytesText::new(page.priority))?;
                    w.create_element("changefreq")
                        .write_text_content(BytesText::new(page.changefreq))?;
                    Ok(())
                })?;
            }
            Ok(())
        })?;

    let mut xml = writer.into_inner();
    xml.push(b'\n');
    fs::write(path, xml)?;
    Ok(())
}

/// Write the plain-text URL list next to the XML sitemap; some indexing
/// tools only accept this format.
pub fn write_url_list(pages: &[PageEntry], path: &Path) -> Result<(), SitemapError> {
    let mut content = String::new();
    for page in pages {
        content.push_str(&page.loc);
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "<html></html>").unwrap();
    }

    #[test]
    fn collects_html_pages_with_clean_index_urls() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("index.html"));
        touch(&dir.path().join("projects/cassava.html"));
        touch(&dir.path().join("notes.txt"));

        let pages = collect_pages(dir.path(), "https://example.github.io/").unwrap();
        let locs: Vec<&str> = pages.iter().map(|p| p.loc.as_str()).collect();
        assert_eq!(
            locs,
            vec![
                "https://example.github.io/",
                "https://example.github.io/projects/cassava.html"
            ]
        );
        assert_eq!(pages[0].priority, "1.0");
        assert_eq!(pages[0].changefreq, "monthly");
        assert_eq!(pages[1].priority, "0.8");
    }

    #[test]
    fn hidden_and_excluded_dirs_are_skipped() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join(".git/page.html"));
        touch(&dir.path().join("site_libs/lib.html"));
        touch(&dir.path().join("renv/index.html"));
        touch(&dir.path().join("real.html"));

        let pages = collect_pages(dir.path(), "https://example.org").unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].loc, "https://example.org/real.html");
    }

    #[test]
    fn sitemap_xml_is_well_formed_enough() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("index.html"));
        let pages = collect_pages(dir.path(), "https://example.org").unwrap();

        let xml_path = dir.path().join("sitemap.xml");
        write_sitemap(&pages, &xml_path).unwrap();
        let xml = fs::read_to_string(&xml_path).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">"));
        assert!(xml.contains("<loc>https://example.org/</loc>"));
        assert!(xml.contains("<priority>1.0</priority>"));
    }

    #[test]
    fn url_list_is_one_loc_per_line() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.html"));
        touch(&dir.path().join("b.html"));
        let pages = collect_pages(dir.path(), "https://example.org").unwrap();

        let txt_path = dir.path().join("sitemap.txt");
        write_url_list(&pages, &txt_path).unwrap();
        let txt = fs::read_to_string(&txt_path).unwrap();
        assert_eq!(txt, "https://example.org/a.html\nhttps://example.org/b.html\n");
    }
}
