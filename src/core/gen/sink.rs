use std::{
    cell::RefCell,
    collections::BTreeMap,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    rc::Rc,
};

/// Destination for generated output units. The dispatcher opens one writer
/// per fully-qualified class name; dropping the writer releases the file on
/// every exit path.
pub trait Sink {
    fn open(&mut self, class_name: &str) -> io::Result<Box<dyn Write>>;
}

/// Writes each class to `<root>/<package dirs>/<ClassName>.java`, creating
/// directories as needed.
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: &Path) -> FsSink {
        FsSink {
            root: root.to_path_buf(),
        }
    }
}

impl Sink for FsSink {
    fn open(&mut self, class_name: &str) -> io::Result<Box<dyn Write>> {
        let mut path = self.root.clone();
        for segment in class_name.split('.') {
            path.push(segment);
        }
        path.set_extension("java");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Box::new(BufWriter::new(File::create(&path)?)))
    }
}

/// In-memory sink for asserting on generated output.
#[derive(Clone)]
pub struct MemSink {
    files: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
}

impl MemSink {
    pub fn new() -> MemSink {
        MemSink {
            files: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }

    pub fn content(&self, class_name: &str) -> Option<String> {
        self.files
            .borrow()
            .get(class_name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn class_names(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl Sink for MemSink {
    fn open(&mut self, class_name: &str) -> io::Result<Box<dyn Write>> {
        self.files
            .borrow_mut()
            .insert(class_name.to_string(), Vec::new());

        Ok(Box::new(MemFile {
            class_name: class_name.to_string(),
            files: self.files.clone(),
        }))
    }
}

struct MemFile {
    class_name: String,
    files: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
}

impl Write for MemFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.files
            .borrow_mut()
            .get_mut(&self.class_name)
            .unwrap()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_sink_collects_writes() {
        //setup
        let mut sink = MemSink::new();

        //exercise
        {
            let mut file = sink.open("generated.Parser").unwrap();
            file.write_all(b"abc").unwrap();
            file.write_all(b"def").unwrap();
        }

        //verify
        assert_eq!(sink.content("generated.Parser").unwrap(), "abcdef");
        assert_eq!(sink.class_names(), vec!["generated.Parser"]);
        assert!(sink.content("other").is_none());
    }

    #[test]
    fn mem_sink_reopen_truncates() {
        //setup
        let mut sink = MemSink::new();

        //exercise
        sink.open("T").unwrap().write_all(b"first").unwrap();
        sink.open("T").unwrap().write_all(b"second").unwrap();

        //verify
        assert_eq!(sink.content("T").unwrap(), "second");
    }
}
