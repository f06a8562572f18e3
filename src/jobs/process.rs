/// Whether a process is an external program or a shell builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    External,
    Builtin,
}

/// A process to execute, possibly the head of a pipeline. Pipelines are a
/// linked list through `pipe`; `pipe_len`, `is_first`, and `is_last` are
/// maintained by [`Process::pipeline`].
#[derive(Debug, Clone)]
pub struct Process {
    pub name: String,
    /// Full argv, including the program name at index 0.
    pub args: Vec<String>,
    pub kind: ProcessKind,
    pub background: bool,
    pub capture: bool,
    pub pipe: Option<Box<Process>>,
    pub pipe_len: usize,
    pub is_first: bool,
    pub is_last: bool,
}

impl Process {
    pub fn new(args: Vec<String>, kind: ProcessKind) -> Self {
        let name = args.first().cloned().unwrap_or_default();
        Self {
            name,
            args,
            kind,
            background: false,
            capture: false,
            pipe: None,
            pipe_len: 1,
            is_first: true,
            is_last: true,
        }
    }

    /// Link a list of stages into one pipeline, fixing up the stage markers.
    pub fn pipeline(stages: Vec<Process>) -> Option<Process> {
        let total = stages.len();
        let mut head: Option<Process> = None;
        for (index, mut stage) in stages.into_iter().enumerate().rev() {
            stage.pipe_len = total;
            stage.is_first = index == 0;
            stage.is_last = index == total - 1;
            stage.pipe = head.take().map(Box::new);
            head = Some(stage);
        }
        head
    }

    /// The stages of this pipeline in order.
    pub fn stages(&self) -> Vec<&Process> {
        let mut stages = vec![self];
        let mut current = self;
        while let Some(next) = &current.pipe {
            stages.push(next);
            current = next;
        }
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external(name: &str) -> Process {
        Process::new(vec![name.to_string()], ProcessKind::External)
    }

    #[test]
    fn test_pipeline_linking() {
        let pipeline =
            Process::pipeline(vec![external("a"), external("b"), external("c")]).unwrap();
        let stages = pipeline.stages();
        assert_eq!(stages.len(), 3);
        assert!(stages[0].is_first && !stages[0].is_last);
        assert!(!stages[1].is_first && !stages[1].is_last);
        assert!(!stages[2].is_first && stages[2].is_last);
        assert!(stages.iter().all(|stage| stage.pipe_len == 3));
    }

    #[test]
    fn test_single_process_is_first_and_last() {
        let process = Process::pipeline(vec![external("a")]).unwrap();
        assert!(process.is_first && process.is_last);
        assert_eq!(process.pipe_len, 1);
    }
}
