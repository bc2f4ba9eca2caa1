use std::env;
use std::fs;
use std::process;
use std::str::FromStr;

use serde_json::value::Value as Json;

use minimustache::{FilesystemTemplateLocator, MiniMustache, DEFAULT_EXTENSION};

fn usage() -> ! {
    eprintln!(
        "Usage: minimustache [--root prefix=dir]... [--ext .tpl] <logical-name> '{{\"json\": \"data\"}}'"
    );
    eprintln!("       json may be given as @file.json");
    process::exit(1);
}

fn parse_json(text: &str) -> Json {
    let result = if let Some(path) = text.strip_prefix('@') {
        match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Cannot read {}: {}", path, e);
                usage()
            }
        }
    } else {
        text.to_owned()
    };
    match Json::from_str(&result) {
        Ok(json) => json,
        Err(_) => usage(),
    }
}

fn parse_root(arg: &str) -> (String, String) {
    match arg.split_once('=') {
        Some((prefix, dir)) if !prefix.is_empty() && !dir.is_empty() => {
            (prefix.to_owned(), dir.to_owned())
        }
        _ => usage(),
    }
}

fn main() {
    env_logger::init();

    let mut roots = Vec::new();
    let mut extension = DEFAULT_EXTENSION.to_owned();
    let mut positional = Vec::new();

    let mut args = env::args();
    args.next(); // skip own filename
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--root" => match args.next() {
                Some(root) => roots.push(parse_root(&root)),
                None => usage(),
            },
            "--ext" => match args.next() {
                Some(ext) => extension = ext,
                None => usage(),
            },
            "-h" | "--help" => usage(),
            _ => positional.push(arg),
        }
    }

    let (name, json) = match positional.as_slice() {
        [name, json] => (name.clone(), json.clone()),
        _ => usage(),
    };
    let data = parse_json(&json);

    if roots.is_empty() {
        roots.push(("page".to_owned(), ".".to_owned()));
    }

    let mut locator = FilesystemTemplateLocator::new(extension);
    for (prefix, dir) in roots.iter() {
        if let Err(e) = locator.add_root(prefix, dir) {
            eprintln!("{}", e);
            process::exit(1);
        }
    }

    let engine = MiniMustache::new(locator);
    match engine.render(&name, &data) {
        Ok(data) => {
            println!("{}", data);
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    }
}
