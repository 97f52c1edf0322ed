use crate::error::ErrorKind;
use crate::eval::Init;
use crate::memory::Endian;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Language primitives; CPUs add their own
pub const PRIMITIVES: &[(&str, usize)] = &[("byte", 1), ("char", 1), ("bool", 1), ("word", 2), ("dword", 4)];

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Primitive {
        name: String,
        size: usize,
    },
    Struct(Struct),
    /// Length is `None` while it waits for an initializer
    Array {
        elem: Rc<Type>,
        len: Option<usize>,
    },
    Typedef {
        name: String,
        target: Rc<Type>,
        address: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
    pub name: String,
    members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    /// Member type, already wrapped in an array when `len` is set
    pub ty: Rc<Type>,
    pub len: Option<usize>,
}

impl Struct {
    pub fn new(name: &str) -> Self {
        Struct {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, ty: Rc<Type>, len: Option<usize>) -> Result<(), ErrorKind> {
        if self.members.iter().any(|m| m.name == name) {
            return Err(ErrorKind::DuplicateSymbol(format!("{}.{name}", self.name)));
        }
        let ty = match len {
            Some(n) => Rc::new(Type::Array {
                elem: ty,
                len: Some(n),
            }),
            None => ty,
        };
        self.members.push(Member {
            name: name.to_string(),
            ty,
            len,
        });
        Ok(())
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Member and its byte offset
    pub fn member(&self, name: &str) -> Option<(&Member, usize)> {
        let mut offset = 0;
        for m in &self.members {
            if m.name == name {
                return Some((m, offset));
            }
            offset += m.ty.size()?;
        }
        None
    }
}

impl Type {
    pub fn array(elem: Rc<Type>, dims: &[usize]) -> Rc<Type> {
        dims.iter().rev().fold(elem, |elem, &len| {
            Rc::new(Type::Array {
                elem,
                len: Some(len),
            })
        })
    }

    /// Follow typedef aliases
    pub fn resolve(&self) -> &Type {
        match self {
            Type::Typedef { target, .. } => target.resolve(),
            ty => ty,
        }
    }

    pub fn size(&self) -> Option<usize> {
        match self {
            Type::Primitive { size, .. } => Some(*size),
            Type::Struct(s) => s.members.iter().map(|m| m.ty.size()).sum(),
            Type::Array { elem, len } => Some(elem.size()? * (*len)?),
            Type::Typedef { target, .. } => target.size(),
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self.resolve() {
            Type::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.resolve(), Type::Array { .. })
    }

    /// Array lengths from the outermost dimension in
    pub fn dims(&self) -> Vec<usize> {
        match self.resolve() {
            Type::Array { elem, len } => {
                let mut dims = vec![len.unwrap_or(0)];
                dims.extend(elem.dims());
                dims
            }
            _ => Vec::new(),
        }
    }

    /// Innermost non-array type
    pub fn element(self: &Rc<Self>) -> Rc<Type> {
        match self.resolve() {
            Type::Array { elem, .. } => elem.element(),
            _ => Rc::clone(self),
        }
    }

    /// Encode an initializer, zero filling what it leaves out
    pub fn encode(&self, init: Option<&Init>, endian: Endian) -> Result<Vec<u8>, ErrorKind> {
        match (self.resolve(), init) {
            (ty, None) => Ok(vec![0; ty.size().unwrap_or(0)]),
            (Type::Primitive { size, .. }, Some(Init::Number(v))) => {
                if !fits(*v, *size) {
                    return Err(ErrorKind::ValueOutOfRange(*v, *size));
                }
                Ok(endian.bytes(*v as u64, *size))
            }
            (Type::Array { elem, len }, Some(Init::List(items))) => {
                let len = len.unwrap_or(items.len());
                if items.len() > len {
                    return Err(ErrorKind::IrregularArrayShape(format!(
                        "{} values for {len} elements",
                        items.len()
                    )));
                }
                let mut bytes = Vec::new();
                for idx in 0..len {
                    bytes.extend(elem.encode(items.get(idx), endian)?);
                }
                Ok(bytes)
            }
            (Type::Struct(s), Some(Init::List(items))) => {
                if items.len() > s.members.len() {
                    return Err(ErrorKind::IrregularArrayShape(format!(
                        "{} values for the {} members of {}",
                        items.len(),
                        s.members.len(),
                        s.name
                    )));
                }
                let mut bytes = Vec::new();
                for (idx, m) in s.members.iter().enumerate() {
                    bytes.extend(m.ty.encode(items.get(idx), endian)?);
                }
                Ok(bytes)
            }
            (ty, Some(Init::List(_))) => Err(ErrorKind::IrregularArrayShape(format!(
                "list given for scalar type {ty}"
            ))),
            (ty, Some(Init::Number(_))) => Err(ErrorKind::IrregularArrayShape(format!(
                "scalar given for {ty}"
            ))),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive { name, .. } => write!(f, "{name}"),
            Type::Struct(s) => write!(f, "struct {}", s.name),
            Type::Array { elem, len: Some(n) } => write!(f, "{elem}[{n}]"),
            Type::Array { elem, len: None } => write!(f, "{elem}[]"),
            Type::Typedef { name, .. } => write!(f, "{name}"),
        }
    }
}

/// Signed or unsigned range of a `width` byte value
fn fits(v: i64, width: usize) -> bool {
    match width {
        0 => v == 0,
        1..=7 => {
            let bits = width as u32 * 8;
            v >= -(1i64 << (bits - 1)) && v < (1i64 << bits)
        }
        _ => true,
    }
}

/// Shape of a nested initializer down to `depth` levels. Same-depth lists must
/// agree in length; anything below `depth` belongs to the element type.
pub fn shape(init: &Init, depth: usize) -> Result<Vec<usize>, ErrorKind> {
    let mut shape = Vec::new();
    let mut level = vec![init];
    while shape.len() < depth {
        let lists: Vec<&Vec<Init>> = level
            .iter()
            .copied()
            .filter_map(|node| match node {
                Init::List(items) => Some(items),
                Init::Number(_) => None,
            })
            .collect();
        if lists.is_empty() {
            return Ok(shape);
        }
        if lists.len() != level.len() {
            return Err(ErrorKind::IrregularArrayShape(format!(
                "values and lists mixed at depth {}",
                shape.len() + 1
            )));
        }
        let len = lists[0].len();
        if let Some(other) = lists.iter().find(|items| items.len() != len) {
            return Err(ErrorKind::IrregularArrayShape(format!(
                "lists of length {len} and {} at depth {}",
                other.len(),
                shape.len() + 1
            )));
        }
        shape.push(len);
        level = lists.into_iter().flatten().collect();
    }
    Ok(shape)
}

/// Fill unsized dimensions from the initializer shape
pub fn infer_dims(dims: &[Option<usize>], init: Option<&Init>) -> Result<Vec<usize>, ErrorKind> {
    if dims.is_empty() {
        return Ok(Vec::new());
    }
    let shape = match init {
        Some(init) => shape(init, dims.len())?,
        None if dims.iter().any(Option::is_none) => {
            return Err(ErrorKind::IrregularArrayShape(
                "array without a size needs an initializer".to_string(),
            ));
        }
        None => Vec::new(),
    };
    dims.iter()
        .enumerate()
        .map(|(depth, dim)| {
            let found = shape.get(depth).copied();
            match (dim, found) {
                (Some(n), Some(found)) if found > *n => Err(ErrorKind::IrregularArrayShape(
                    format!("{found} values for dimension of {n}"),
                )),
                (Some(n), _) => Ok(*n),
                (None, Some(found)) => Ok(found),
                (None, None) => Err(ErrorKind::IrregularArrayShape(format!(
                    "cannot infer dimension {} from the initializer",
                    depth + 1
                ))),
            }
        })
        .collect()
}

/// Type names registered during one compilation
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, Rc<Type>>,
    builtins: usize,
}

impl TypeRegistry {
    pub fn new<'a>(primitives: impl IntoIterator<Item = &'a (&'a str, usize)>) -> Self {
        let mut types = IndexMap::new();
        for &(name, size) in primitives {
            let ty = Type::Primitive {
                name: name.to_string(),
                size,
            };
            types.insert(name.to_string(), Rc::new(ty));
        }
        let builtins = types.len();
        TypeRegistry { types, builtins }
    }

    pub fn register(&mut self, name: &str, ty: Type) -> Result<Rc<Type>, ErrorKind> {
        if self.types.contains_key(name) {
            return Err(ErrorKind::DuplicateType(name.to_string()));
        }
        let ty = Rc::new(ty);
        self.types.insert(name.to_string(), Rc::clone(&ty));
        log::debug!("type {name}: {ty}");
        Ok(ty)
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Type>> {
        self.types.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<Type>)> {
        self.types.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    /// Types registered by declarations, in declaration order
    pub fn user_types(&self) -> impl Iterator<Item = (&str, &Rc<Type>)> {
        self.iter().skip(self.builtins)
    }
}
