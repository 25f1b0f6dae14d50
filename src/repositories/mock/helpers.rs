use super::{RepositoryError, Result as RepoResult};

/// position of the single element matching `predicate`.
pub fn find_index<T, P>(v: &[T], mut predicate: P) -> RepoResult<usize>
where P: FnMut(&T) -> bool {
    let mut found = v
        .iter()
        .enumerate()
        .filter(|(_, t)| predicate(t))
        .map(|(i, _)| i);

    match (found.next(), found.count()) {
        (None, _) => Err(RepositoryError::NotFound),
        (Some(i), 0) => Ok(i),
        (Some(_), rest) => Err(RepositoryError::NoUnique {
            matched: rest as u32 + 1,
        }),
    }
}

pub fn find_ref<T, P>(v: &[T], predicate: P) -> RepoResult<&T>
where P: FnMut(&T) -> bool {
    let i = find_index(v, predicate)?;
    tracing::trace!("found at {}", i);

    Ok(&v[i])
}

pub fn find_mut<T, P>(v: &mut [T], predicate: P) -> RepoResult<&mut T>
where P: FnMut(&T) -> bool {
    let i = find_index(v, predicate)?;
    tracing::trace!("found at {} (mut)", i);

    Ok(&mut v[i])
}
