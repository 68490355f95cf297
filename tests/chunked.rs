use std::collections::LinkedList;
use std::rc::Rc;
use std::sync::Arc;

use defmac::defmac;
use itertools::assert_equal;
use ndarray::{array, s, Array1, ArrayD, ArrayView1, Ix2, Ix3, IxDyn};

use chunked_gen::ChunksBuilder;
use ndarray_chunked::{Chunk, ChunkIndex, ChunkSeq, ChunkSlice, ChunkedArray, ChunkedError};

fn example() -> ChunkedArray<Vec<Vec<i32>>>
{
    ChunkedArray::new(vec![vec![], vec![0, 1, 2, 3, 4], vec![5, 6], vec![], vec![7, 8, 9], vec![]])
}

fn scalars<'a, I>(cells: I) -> Vec<i32>
where I: IntoIterator<Item = ndarray::ArrayViewD<'a, i32>>
{
    cells
        .into_iter()
        .map(|cell| *cell.into_dimensionality::<ndarray::Ix0>().unwrap().into_scalar())
        .collect()
}

#[test]
fn example_reads()
{
    let a = example();
    assert_equal(scalars(&a), 0..10);
    assert_eq!(a.len(), 10);
    assert_eq!(a.num_chunks(), 6);
    assert_eq!(a.get_scalar(7), Ok(&7));
    assert_eq!(a.slice(ChunkSlice::from(2..9).step_by(2)).unwrap(), array![2, 4, 6, 8].into_dyn());
    assert_eq!(a.take(&[9, 0, 5]).unwrap(), array![9, 0, 5].into_dyn());
    assert_eq!(a.compress(&[true; 10]).unwrap(), Array1::from_iter(0..10).into_dyn());
}

#[test]
fn empty_sequence()
{
    let a = ChunkedArray::new(Vec::<Vec<i32>>::new());
    assert_eq!(a.iter().count(), 0);
    assert!(a.is_empty());
    assert_eq!(a.element_type(), Err(ChunkedError::EmptySequence));
    assert_eq!(a.cell_shape(), Err(ChunkedError::EmptySequence));
    assert_eq!(a.get(0), Err(ChunkedError::IndexOutOfBounds { index: 0, len: 0 }));
    assert_eq!(a.slice(..).unwrap().shape(), &[0]);
    assert_eq!(a.take(&[]).unwrap().shape(), &[0]);
    assert_eq!(a.compress(&[]).unwrap().shape(), &[0]);
}

#[test]
fn iteration_restarts()
{
    let a = example();
    let mut first = a.iter();
    first.next();
    first.next();
    assert_equal(scalars(a.iter()), 0..10);
    assert_equal(scalars(first), 2..10);
}

#[test]
fn integer_errors()
{
    let a = example();
    assert_eq!(a.get(-1), Err(ChunkedError::InvalidIndex(-1)));
    assert_eq!(a.get(10), Err(ChunkedError::IndexOutOfBounds { index: 10, len: 10 }));
    assert!(a.get(100).unwrap_err().is_out_of_bounds());
    assert_eq!(a.read(-3).unwrap_err(), ChunkedError::InvalidIndex(-3));

    // unsigned positions past isize::MAX are out of bounds, never negative
    assert!(a.read(usize::MAX).unwrap_err().is_out_of_bounds());
    assert!(a.read(1usize << 63).unwrap_err().is_out_of_bounds());
    assert!(a.read(u32::MAX).unwrap_err().is_out_of_bounds());
    assert!(matches!(a.read(vec![usize::MAX]), Err(ChunkedError::IndexOutOfBounds { len: 10, .. })));
    assert!(matches!(a.read(vec![0usize, usize::MAX]), Err(ChunkedError::IndexOutOfBounds { len: 10, .. })));
}

#[test]
fn slices()
{
    let a = example();
    defmac!(sl start, stop, step => a.slice(ChunkSlice::new(start, stop, step)).unwrap());

    assert_eq!(sl!(None, None, 1), Array1::from_iter(0..10).into_dyn());
    assert_eq!(sl!(Some(3), Some(7), 1), array![3, 4, 5, 6].into_dyn());
    assert_eq!(sl!(Some(4), Some(6), 1), array![4, 5].into_dyn());
    assert_eq!(sl!(Some(1), None, 3), array![1, 4, 7].into_dyn());
    assert_eq!(sl!(None, None, -1), Array1::from_iter((0..10).rev()).into_dyn());
    assert_eq!(sl!(Some(8), Some(2), -2), array![8, 6, 4].into_dyn());
    assert_eq!(sl!(Some(5), None, -4), array![5, 1].into_dyn());
    assert_eq!(sl!(Some(7), Some(7), 1).shape(), &[0]);
    assert_eq!(sl!(Some(20), None, 1).shape(), &[0]);
    assert_eq!(sl!(Some(3), Some(8), -1).shape(), &[0]);
    assert_eq!(sl!(Some(20), Some(8), -1), array![9].into_dyn());
    assert_eq!(sl!(None, None, isize::MIN), array![9].into_dyn());
    assert_eq!(sl!(Some(1), None, isize::MAX), array![1].into_dyn());
    assert_eq!(sl!(None, None, isize::MAX), array![0].into_dyn());
}

#[test]
fn slice_errors()
{
    let a = example();
    assert_eq!(a.slice(ChunkSlice::new(None, None, 0)), Err(ChunkedError::InvalidSlice));
    assert_eq!(a.slice(ChunkSlice::new(Some(-1), None, 1)), Err(ChunkedError::InvalidIndex(-1)));
    assert_eq!(a.slice(ChunkSlice::new(None, Some(-2), -1)), Err(ChunkedError::InvalidIndex(-2)));
}

#[test]
fn slice_within_one_chunk_borrows()
{
    let a = example();
    assert!(a.slice(1..4).unwrap().is_view());
    assert!(a.slice(ChunkSlice::new(Some(3), Some(0), -1)).unwrap().is_view());
    assert!(!a.slice(3..6).unwrap().is_view());
}

#[test]
fn fancy()
{
    let a = example();
    assert_eq!(a.take(&[3, 3, 8, 0]).unwrap(), array![3, 3, 8, 0].into_dyn());
    assert_eq!(a.take(&[9]).unwrap(), array![9].into_dyn());
    assert_eq!(a.take(&[1, -1]), Err(ChunkedError::InvalidIndex(-1)));
    assert_eq!(a.take(&[2, 10, 4]), Err(ChunkedError::IndexOutOfBounds { index: 10, len: 10 }));
}

#[test]
fn fancy_stops_after_largest_position()
{
    // the second chunk has a different cell shape and is never visited
    let chunks = vec![array![[0, 1], [2, 3]].into_dyn(), array![[[0]]].into_dyn()];
    let a = ChunkedArray::new(chunks);
    assert_eq!(a.take(&[1, 0]).unwrap(), array![[2, 3], [0, 1]].into_dyn());
    assert_eq!(a.take(&[2]).unwrap().shape(), &[1, 1, 1]);
    assert!(matches!(a.take(&[0, 2]), Err(ChunkedError::Shape(_))));
}

#[test]
fn masks()
{
    let a = example();
    let mask: Vec<bool> = (0..10).map(|i| i % 3 == 0).collect();
    assert_eq!(a.compress(&mask).unwrap(), array![0, 3, 6, 9].into_dyn());
    assert_eq!(a.compress(&[false; 10]).unwrap().shape(), &[0]);
    assert_eq!(
        a.compress(&[true; 9]),
        Err(ChunkedError::LengthMismatch {
            expected: 10,
            actual: 9,
        })
    );
    assert!(a.compress(&[false; 11]).is_err());
}

#[test]
fn dispatch()
{
    let a = example();
    assert_eq!(a.read(4).unwrap(), ArrayD::from_elem(IxDyn(&[]), 4));
    assert_eq!(a.read(2..9).unwrap(), Array1::from_iter(2..9).into_dyn());
    assert_eq!(a.read(vec![9, 0, 5]).unwrap(), array![9, 0, 5].into_dyn());
    assert_eq!(a.read(vec![true; 10]).unwrap(), Array1::from_iter(0..10).into_dyn());
    let two_d = ArrayD::<isize>::zeros(IxDyn(&[2, 2]));
    assert_eq!(
        a.read(ChunkIndex::Positions(two_d)),
        Err(ChunkedError::UnsupportedIndexShape { ndim: 2 })
    );
}

#[test]
fn cells_with_trailing_indices()
{
    let (chunks, flat) = ChunksBuilder::new([2, 0, 3]).cell_shape(&[3, 2]).build_with_flat::<i64>();
    let flat = flat.into_dimensionality::<Ix3>().unwrap();
    let a = ChunkedArray::new(chunks);
    assert_eq!(a.cell_shape().unwrap(), vec![3, 2]);
    assert_eq!(a.element_type().unwrap().shape, vec![3, 2]);

    let cell = a.read_with(3, s![1, ..]).unwrap();
    assert_eq!(cell, flat.slice(s![3, 1, ..]).into_dyn());
    let column = a.read_with(1..5, &s![.., -1]).unwrap();
    assert_eq!(column, flat.slice(s![1..5, .., -1]).into_dyn());
    let picked = a.read_with(vec![4, 0], &s![2, 0]).unwrap();
    assert_eq!(picked, array![28, 4].into_dyn());
    assert_eq!(
        a.read_with(0, &s![0, 0, 0]),
        Err(ChunkedError::TooManyIndices { ndim: 2, given: 3 })
    );
}

#[test]
fn multidimensional_chunks_of_mixed_layout()
{
    let (chunks, flat) = ChunksBuilder::new([1, 4, 2])
        .cell_shape(&[3])
        .memory_order(ndarray::Order::F)
        .build_with_flat::<f32>();
    let a = ChunkedArray::new(chunks);
    assert_eq!(a.to_array().unwrap(), flat);
    let flat = flat.into_dimensionality::<Ix2>().unwrap();
    assert_eq!(a.slice(ChunkSlice::new(None, None, -2)).unwrap(), flat.slice(s![..;-2, ..]).into_dyn());
    assert_eq!(a.get(5).unwrap(), flat.slice(s![5, ..]).into_dyn());
}

#[test]
fn heterogeneous_chunk_storage()
{
    let shared: Arc<Array1<u8>> = Arc::new(array![3, 4]);
    let chunks: Vec<Box<dyn Chunk<Elem = u8>>> = vec![
        Box::new(vec![0u8, 1, 2]),
        Box::new(shared.clone()),
        Box::new(Rc::new(array![5u8, 6])),
        Box::new(shared),
    ];
    let a = ChunkedArray::new(chunks);
    assert_eq!(a.len(), 9);
    assert_eq!(a.take(&[8, 5, 2]).unwrap(), array![4, 5, 2].into_dyn());
    assert_eq!(a.get_scalar(6), Ok(&6));
}

#[test]
fn borrowed_sequences()
{
    let owned = vec![vec![1, 2], vec![3]];
    let a = ChunkedArray::new(owned.as_slice());
    assert!(!a.is_appendable());
    assert_eq!(a.compress(&[true, false, true]).unwrap(), array![1, 3].into_dyn());

    let mut list = LinkedList::new();
    list.push_back(vec![10, 11]);
    let mut a = ChunkedArray::new(&mut list);
    a.append(vec![12]).unwrap();
    assert_eq!(a.len(), 3);
    drop(a);
    assert_eq!(list.num_chunks(), 2);
}

#[test]
fn append_is_seen_by_next_read()
{
    let mut a = ChunkedArray::new(vec![array![1, 2]]);
    assert_eq!(a.get(2), Err(ChunkedError::IndexOutOfBounds { index: 2, len: 2 }));
    a.append(array![3]).unwrap();
    assert_eq!(a.get_scalar(2), Ok(&3));
    let mut frozen = ChunkedArray::builder(vec![array![1]]).appendable(false).build().unwrap();
    assert!(matches!(frozen.append(array![2]), Err(ChunkedError::UnsupportedOperation(_))));
}

#[test]
fn element_type_from_first_chunk()
{
    let a = ChunkedArray::new(vec![ArrayD::<f64>::zeros(IxDyn(&[0, 4]))]);
    let dtype = a.element_type().unwrap();
    assert_eq!(dtype.shape, vec![4]);
    assert_eq!(dtype.cell_size(), 4);
    assert!(dtype.name.contains("f64"));
}

#[test]
fn views_as_chunks()
{
    let base = Array1::from_iter(0..12);
    let views: Vec<ArrayView1<'_, i32>> = base.exact_chunks(4).into_iter().collect();
    let a = ChunkedArray::new(views);
    assert_equal(scalars(&a), 0..12);
    assert_eq!(a.slice(ChunkSlice::from(..).step_by(5)).unwrap(), array![0, 5, 10].into_dyn());
}
